//! Domain layer
//! 명령 명세, 입력 파싱, 인자 바인딩, 도움말 렌더링을 I/O 없이 표현한다.

pub mod arg;
pub mod binder;
pub mod help;
pub mod option;
pub mod parser;
pub mod spec;
pub mod tokenizer;
pub mod value;
