//! 사용자 설정(JSON) 로딩/병합 모듈.
//! 여러 경로의 설정을 우선순위대로 병합하고, 어떤 파일이 읽혔는지 함께 제공한다.

mod loader;

pub use loader::{
    CONFIG_ENV, LoadedConfig, config_paths, load_from_paths, load_merged_config, read_config,
};
