#![allow(dead_code)]

use bp_nativize::backend::context::{ClassEmissionContext, EmitterContext, StateMaps};
use bp_nativize::backend::{BackendOptions, BufferedLogger, GeneratedClass, generate_class};
use compiled_ir::builder::ClassBuilder;
use compiled_ir::{CompiledClass, PinCategory, PinType, PropertyId, TerminalId};

pub fn door() -> ClassBuilder {
    let mut b = ClassBuilder::new("BP_Door_C", "Actor");
    b.native_class("Actor", "A", Some("Object"));
    b
}

/// Member property and a terminal reading it
pub fn member(b: &mut ClassBuilder, name: &str, category: PinCategory) -> (PropertyId, TerminalId) {
    let property = b.member(name, PinType::new(category));
    let term = b.property_term(property);
    (property, term)
}

pub fn generate(ir: &CompiledClass) -> GeneratedClass {
    let logger = BufferedLogger::all();
    generate_class(ir, &BackendOptions::default(), &logger).unwrap()
}

pub fn generate_logged(ir: &CompiledClass) -> (GeneratedClass, BufferedLogger) {
    let logger = BufferedLogger::all();
    let generated = generate_class(ir, &BackendOptions::default(), &logger).unwrap();
    (generated, logger)
}

/// Runs `f` against a fresh emitter of function `function_index` and returns what it emitted
pub fn with_emitter<T>(
    ir: &CompiledClass,
    function_index: usize,
    f: impl FnOnce(&mut EmitterContext) -> T,
) -> (T, String) {
    let options = BackendOptions::default();
    let logger = BufferedLogger::all();
    let class = ClassEmissionContext::new(ir, &options, &logger);
    let mut states = StateMaps::default();
    let mut ctx = EmitterContext::new(&class, &mut states, function_index, 0);
    let result = f(&mut ctx);
    (result, ctx.code.into_string())
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Indices of every `case N:` label, in emission order
pub fn case_labels(code: &str) -> Vec<i32> {
    code.lines()
        .filter_map(|line| line.trim().strip_prefix("case "))
        .filter_map(|rest| rest.strip_suffix(':'))
        .filter_map(|index| index.parse().ok())
        .collect()
}
