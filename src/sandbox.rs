//! Restricted Rhai environments.
//!
//! Each purpose gets its own engine with an explicit binding set: the
//! standard Rhai library, no module loading and no `eval`. Compiler programs
//! additionally lose `try`, so a failed include cannot be swallowed.

use rhai::{
    Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext, Position,
    Scope, module_resolvers::DummyModuleResolver,
};

use crate::escape::escape_html;
use crate::{log_debug, log_println};

/// Escape helper available to artifacts.
pub const ESCAPE_FN: &str = "__e";
/// Parameter holding the input record of an artifact.
pub const LOCALS: &str = "locals";
/// Output accumulator of an artifact.
pub const OUTPUT_VAR: &str = "__r";
/// Calls a nested artifact with the given record, or an empty one.
pub const INVOKE_FN: &str = "__i";

/// Value captured for a name the enclosing artifact never defined.
///
/// Reading it through the escape helper or `to_string` fails as an unknown
/// variable would.
#[derive(Debug, Clone)]
pub struct Unbound(ImmutableString);

impl Unbound {
    fn error(&self) -> Box<EvalAltResult> {
        EvalAltResult::ErrorVariableNotFound(self.0.to_string(), Position::NONE).into()
    }
}

fn defined(value: Dynamic) -> Result<Dynamic, Box<EvalAltResult>> {
    if let Some(unbound) = value.read_lock::<Unbound>() {
        return Err(unbound.error());
    }
    Ok(value)
}

pub struct Sandbox {
    engine: Engine,
    scope: Scope<'static>,
}

impl Sandbox {
    pub fn restricted() -> Self {
        let mut engine = Engine::new();
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine
            .on_debug(|txt, src, pos| {
                let src = src.map(|s| format!("({s}) ")).unwrap_or_default();
                log_debug!("Rhai @ {src}{pos} : {txt}");
            })
            .on_print(|txt| {
                log_println!("{txt}");
            });
        Sandbox {
            engine,
            scope: Scope::new(),
        }
    }

    /// Environment compiler programs run in. Bindings are installed by the compiler.
    pub fn compiler() -> Self {
        let mut sandbox = Self::restricted();
        sandbox.engine.disable_symbol("try");
        sandbox
    }

    /// Environment artifacts run in.
    ///
    /// Bare identifiers an artifact does not define itself resolve against its
    /// `locals` record first, then against what it captured from the artifact
    /// enclosing it. Nested artifacts are invoked through [`INVOKE_FN`].
    pub fn artifact() -> Self {
        let mut sandbox = Self::restricted();
        let engine = &mut sandbox.engine;
        engine
            .register_type_with_name::<Unbound>("unbound")
            .register_fn(ESCAPE_FN, |value: Dynamic| {
                defined(value).map(|value| escape_html(&value.to_string()))
            })
            .register_fn("to_string", |unbound: &mut Unbound| -> Result<String, Box<EvalAltResult>> {
                Err(unbound.error())
            })
            .register_fn(
                INVOKE_FN,
                |context: NativeCallContext, artifact: FnPtr| -> Result<Dynamic, Box<EvalAltResult>> {
                    artifact.call_within_context(&context, (Map::new(),))
                },
            )
            .register_fn(
                INVOKE_FN,
                |context: NativeCallContext,
                 artifact: FnPtr,
                 locals: Map|
                 -> Result<Dynamic, Box<EvalAltResult>> {
                    artifact.call_within_context(&context, (locals,))
                },
            );
        #[allow(deprecated)]
        engine.on_var(|name, index, context| {
            if index > 0 || name == LOCALS {
                return Ok(None);
            }
            let scope = context.scope();
            if let Some(value) = scope
                .get_value::<Map>(LOCALS)
                .and_then(|locals| locals.get(name).cloned())
            {
                return Ok(Some(value));
            }
            if scope.contains(name) || scope.contains(LOCALS) {
                return Ok(None);
            }
            // Captured while the artifact itself is created, outside any record.
            Ok(Some(Dynamic::from(Unbound(name.into()))))
        });
        sandbox
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn scope_mut(&mut self) -> &mut Scope<'static> {
        &mut self.scope
    }

    pub fn run(&mut self, script: &str) -> Result<(), Box<EvalAltResult>> {
        self.engine.run_with_scope(&mut self.scope, script)
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }
}
