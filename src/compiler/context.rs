//! Bindings available to compiler programs.
//!
//! These are the only ways compile-time code can affect the artifact: appending
//! code to its body, defining constants in it, and pulling in other templates.

use std::{cell::RefCell, rc::Rc};

use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, INT, ImmutableString, Map, NativeCallContext,
    Position, Scope,
};

use crate::compiler::fragments::{FRAGMENT_FN, FragmentTable};
use crate::compiler::{FOOTER, compile_code_from_file, header};
use crate::error::TemplateError;
use crate::escape::{quote, string_escape};
use crate::literal::to_literal;
use crate::loader;
use crate::log_debug;
use crate::options::Options;
use crate::sandbox::{INVOKE_FN, OUTPUT_VAR, Sandbox};

#[derive(Default)]
struct BodyState {
    body: RefCell<String>,
    failure: RefCell<Option<TemplateError>>,
}

/// Appends code to the artifact body being generated.
///
/// Clones share the same body. A failure reported through [`fail`](Self::fail)
/// is kept and becomes the result of the compilation.
#[derive(Clone, Default)]
pub struct BodyWriter {
    state: Rc<BodyState>,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw artifact code.
    pub fn write(&self, code: &str) {
        self.state.body.borrow_mut().push_str(code);
    }

    /// Appends code emitting `text` verbatim on every render.
    pub fn output(&self, text: &str) {
        self.write(&format!("{OUTPUT_VAR} += {};", quote(text)));
    }

    /// Appends `const name = code;`.
    pub fn define(&self, name: &str, code: &str) -> Result<(), TemplateError> {
        check_name(name)?;
        self.write(&format!("const {name} = {code};"));
        Ok(())
    }

    /// Records `err` as the cause of the compilation failure and converts it
    /// for propagation through Rhai. The first recorded failure wins.
    pub fn fail(&self, err: TemplateError) -> Box<EvalAltResult> {
        let message = err.to_string();
        self.state.failure.borrow_mut().get_or_insert(err);
        EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
    }

    pub(crate) fn take_failure(&self) -> Option<TemplateError> {
        self.state.failure.borrow_mut().take()
    }

    pub fn body(&self) -> String {
        self.state.body.borrow().clone()
    }
}

/// What a host extension gets to work with.
pub struct CompilerContext<'a> {
    sandbox: &'a mut Sandbox,
    writer: BodyWriter,
    options: &'a Options,
}

impl<'a> CompilerContext<'a> {
    pub(crate) fn new(sandbox: &'a mut Sandbox, writer: BodyWriter, options: &'a Options) -> Self {
        CompilerContext {
            sandbox,
            writer,
            options,
        }
    }

    /// The compiler engine. Functions registered here are callable from compiler-control directives.
    pub fn engine_mut(&mut self) -> &mut Engine {
        self.sandbox.engine_mut()
    }

    /// The scope compiler programs run in.
    pub fn scope_mut(&mut self) -> &mut Scope<'static> {
        self.sandbox.scope_mut()
    }

    pub fn writer(&self) -> BodyWriter {
        self.writer.clone()
    }

    pub fn options(&self) -> &Options {
        self.options
    }
}

/// Start of a nested artifact binding, callable with or without a record.
/// Closed by `)` after the artifact.
fn callable_open() -> String {
    format!("Fn(\"{INVOKE_FN}\").curry(")
}

fn check_name(name: &str) -> Result<(), TemplateError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().any(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(TemplateError::configuration(format!(
            "`{name}` is not a valid binding name"
        )))
    }
}

/// Registers the composition bindings in a compiler sandbox.
pub(crate) fn install(
    sandbox: &mut Sandbox,
    fragments: FragmentTable,
    options: &Options,
    writer: &BodyWriter,
) {
    let fragments = Rc::new(fragments);
    let engine = sandbox.engine_mut();

    let w = writer.clone();
    engine.register_fn(
        FRAGMENT_FN,
        move |index: INT| -> Result<String, Box<EvalAltResult>> {
            usize::try_from(index)
                .ok()
                .and_then(|index| fragments.get(index))
                .map(str::to_string)
                .ok_or_else(|| {
                    w.fail(TemplateError::evaluation(format!("no fragment at index {index}")))
                })
        },
    );

    let w = writer.clone();
    engine.register_fn("write", move |code: &str| w.write(code));

    let w = writer.clone();
    engine.register_fn("output", move |text: &str| w.output(text));

    engine.register_fn("string_escape", |text: &str| string_escape(text));

    let w = writer.clone();
    engine.register_fn(
        "embed_object",
        move |name: &str, data: Dynamic| -> Result<(), Box<EvalAltResult>> {
            to_literal(&data)
                .and_then(|literal| w.define(name, &literal))
                .map_err(|err| w.fail(err))
        },
    );

    let (o, w) = (options.clone(), writer.clone());
    engine.register_fn(
        "include",
        move |name: &str, request: &str| -> Result<(), Box<EvalAltResult>> {
            include(&o, &w, name, request, None).map_err(|err| w.fail(err))
        },
    );

    let (o, w) = (options.clone(), writer.clone());
    engine.register_fn(
        "include",
        move |name: &str, request: &str, overrides: Map| -> Result<(), Box<EvalAltResult>> {
            include(&o, &w, name, request, Some(&overrides)).map_err(|err| w.fail(err))
        },
    );

    let (o, w) = (options.clone(), writer.clone());
    engine.register_fn(
        "include_all",
        move |requests: Map| -> Result<(), Box<EvalAltResult>> {
            include_all(&o, &w, &requests).map_err(|err| w.fail(err))
        },
    );

    let w = writer.clone();
    engine.register_fn(
        "template",
        move |context: NativeCallContext, name: &str, body: FnPtr| -> Result<(), Box<EvalAltResult>> {
            template(&context, &w, name, &Map::new(), &body)
        },
    );

    let w = writer.clone();
    engine.register_fn(
        "template",
        move |context: NativeCallContext,
              name: &str,
              settings: Map,
              body: FnPtr|
              -> Result<(), Box<EvalAltResult>> {
            template(&context, &w, name, &settings, &body)
        },
    );

    let (o, w) = (options.clone(), writer.clone());
    engine.register_fn(
        "load_json",
        move |request: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            load_json(&o, request).map_err(|err| w.fail(err))
        },
    );

    let path_constant = |path: Option<&std::path::Path>| {
        path.map(|path| Dynamic::from(path.to_string_lossy().into_owned()))
            .unwrap_or(Dynamic::UNIT)
    };
    let scope = sandbox.scope_mut();
    scope.push_constant("filename", path_constant(options.filename.as_deref()));
    scope.push_constant("dirname", path_constant(options.dirname()));
}

fn include(
    options: &Options,
    writer: &BodyWriter,
    name: &str,
    request: &str,
    overrides: Option<&Map>,
) -> Result<(), TemplateError> {
    check_name(name)?;
    let path = loader::resolve(request, options.filename.as_deref())?;
    let mut child = options.for_include();
    if let Some(overrides) = overrides {
        child.apply_overrides(overrides)?;
    }
    log_debug!("including `{request}` as `{name}` from {}", path.display());
    let code = compile_code_from_file(&path, &child).map_err(|err| {
        TemplateError::new(err.kind, format!("cannot include `{request}` as `{name}`: {err}"))
            .caused_by(err)
    })?;
    writer.define(name, &format!("{}{code})", callable_open()))
}

/// Includes in key order. The first failure stops the whole call.
fn include_all(options: &Options, writer: &BodyWriter, requests: &Map) -> Result<(), TemplateError> {
    for (name, entry) in requests {
        let (request, overrides) = include_entry(name, entry)?;
        include(options, writer, name, &request, overrides.as_ref())?;
    }
    Ok(())
}

fn include_entry(name: &str, entry: &Dynamic) -> Result<(ImmutableString, Option<Map>), TemplateError> {
    let invalid = || {
        TemplateError::configuration(format!(
            "include_all entry `{name}` must be a path or a [path, options] pair"
        ))
    };
    if let Some(request) = entry.clone().try_cast::<ImmutableString>() {
        return Ok((request, None));
    }
    let pair = entry.clone().try_cast::<Array>().ok_or_else(invalid)?;
    match pair.as_slice() {
        [request] => Ok((
            request.clone().try_cast::<ImmutableString>().ok_or_else(invalid)?,
            None,
        )),
        [request, overrides] => Ok((
            request.clone().try_cast::<ImmutableString>().ok_or_else(invalid)?,
            Some(overrides.clone().try_cast::<Map>().ok_or_else(invalid)?),
        )),
        _ => Err(invalid()),
    }
}

/// Writes a nested artifact header, runs `body` so it can emit the nested
/// template's code, then closes the artifact.
fn template(
    context: &NativeCallContext,
    writer: &BodyWriter,
    name: &str,
    settings: &Map,
    body: &FnPtr,
) -> Result<(), Box<EvalAltResult>> {
    let is_async = template_settings(settings).map_err(|err| writer.fail(err))?;
    check_name(name).map_err(|err| writer.fail(err))?;
    writer.write(&format!("const {name} = {}{}", callable_open(), header(is_async)));
    let _ = body.call_within_context::<Dynamic>(context, ())?;
    writer.write(&format!("{FOOTER});\n"));
    Ok(())
}

fn template_settings(settings: &Map) -> Result<bool, TemplateError> {
    let mut is_async = false;
    for (key, value) in settings {
        match key.as_str() {
            "async" => {
                is_async = value.as_bool().map_err(|_| {
                    TemplateError::configuration("the `async` template option must be a boolean")
                })?;
            }
            other => {
                return Err(TemplateError::configuration(format!(
                    "unknown template option `{other}`"
                )));
            }
        }
    }
    Ok(is_async)
}

fn load_json(options: &Options, request: &str) -> Result<Dynamic, TemplateError> {
    let path = loader::resolve(request, options.filename.as_deref())?;
    let encoding = loader::resolve_encoding(options.encoding.as_deref())?;
    let text = options.loader.load(&path, encoding)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| TemplateError::from(err).in_file(&path))?;
    rhai::serde::to_dynamic(&value).map_err(|err| TemplateError::from(err).in_file(&path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_names() {
        for name in ["s", "_private", "card2"] {
            assert!(check_name(name).is_ok(), "{name} should be accepted");
        }
        for name in ["", "_", "__", "2cards", "a-b", "a b", "ünï"] {
            assert!(check_name(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn test_first_failure_is_kept() {
        let writer = BodyWriter::new();
        let _ = writer.fail(TemplateError::resolution("first"));
        let _ = writer.fail(TemplateError::evaluation("second"));
        let kept = writer.take_failure().expect("a failure was recorded");
        assert_eq!(kept.info, "first");
        assert!(writer.take_failure().is_none());
    }

    #[test]
    fn test_output_escapes_text() {
        let writer = BodyWriter::new();
        writer.output("say \"hi\"\n");
        assert_eq!(writer.body(), r#"__r += "say \"hi\"\n";"#);
    }
}
