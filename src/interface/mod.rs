//! Interface layer
//! 바이너리 진입점과 라이브러리 사용자가 셸을 조립/구동하는 경계.

pub mod cli;
pub mod composition;
