pub mod backend;

pub use compiled_ir;
