//! Scripted compiler shared by the driver integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use shader_driver::{
    CompileFlags, CompileRequest, CompilationDriver, CompilerLoader, Invocation, LoadError,
    LoadOutcome, ShaderCompiler,
};

/// What the compiler saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub source: String,
    pub source_name: String,
    pub entry_point: String,
    pub target: String,
    pub flags1: CompileFlags,
    pub flags2: u32,
}

pub type CallLog = Rc<RefCell<Vec<SeenRequest>>>;

/// Returns queued invocations in order; panics when asked for more.
pub struct ScriptedCompiler {
    script: RefCell<VecDeque<Invocation>>,
    calls: CallLog,
}

impl ShaderCompiler for ScriptedCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Invocation {
        self.calls.borrow_mut().push(SeenRequest {
            source: request.source.to_string(),
            source_name: request.source_name.to_string(),
            entry_point: request.entry_point.to_string(),
            target: request.target.to_string(),
            flags1: request.flags1,
            flags2: request.flags2,
        });
        self.script
            .borrow_mut()
            .pop_front()
            .expect("compiler invoked more times than scripted")
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

pub struct ScriptedLoader {
    script: RefCell<Option<Vec<Invocation>>>,
    calls: CallLog,
}

impl CompilerLoader for ScriptedLoader {
    type Compiler = ScriptedCompiler;

    fn load(&self) -> Result<LoadOutcome<ScriptedCompiler>, LoadError> {
        let script = self.script.borrow_mut().take().unwrap_or_default();
        Ok(LoadOutcome::Loaded(ScriptedCompiler {
            script: RefCell::new(script.into()),
            calls: Rc::clone(&self.calls),
        }))
    }
}

/// An initialized driver that will answer with `script`, plus its call log.
pub fn scripted_driver(script: Vec<Invocation>) -> (CompilationDriver<ScriptedLoader>, CallLog) {
    let calls = CallLog::default();
    let loader = ScriptedLoader {
        script: RefCell::new(Some(script)),
        calls: Rc::clone(&calls),
    };
    let mut driver = CompilationDriver::new(loader);
    driver.initialize().expect("scripted loader always loads");
    (driver, calls)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub const PIXEL_SHADER: &str = r#"
float4 main(float4 color : COLOR0) : SV_Target
{
    [loop] for (int i = 0; i < 64; i++) { color *= 0.99; }
    return color;
}
"#;
