//! Compiled templates and the input records they render.

use std::{fmt, future::Future, pin::Pin};

use futures::future::try_join_all;
use rhai::{AST, Dynamic, Engine, FnPtr, Map};

use crate::error::TemplateError;
use crate::sandbox::Sandbox;

/// A value that becomes available later, resolved before an asynchronous render.
pub type PendingValue = Pin<Box<dyn Future<Output = Result<Dynamic, TemplateError>>>>;

/// The input record of a render.
#[derive(Default)]
pub struct Locals {
    values: Map,
    pending: Vec<(String, PendingValue)>,
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locals")
            .field("values", &self.values)
            .field(
                "pending",
                &self.pending.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl From<Map> for Locals {
    fn from(values: Map) -> Self {
        Locals {
            values,
            pending: Vec::new(),
        }
    }
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Dynamic>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert_pending<F>(&mut self, name: &str, value: F)
    where
        F: Future<Output = Result<Dynamic, TemplateError>> + 'static,
    {
        self.pending.push((name.to_string(), Box::pin(value)));
    }

    pub fn with_pending<F>(mut self, name: &str, value: F) -> Self
    where
        F: Future<Output = Result<Dynamic, TemplateError>> + 'static,
    {
        self.insert_pending(name, value);
        self
    }

    /// Builds a record from a JSON object. `null` gives an empty record.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TemplateError> {
        match value {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Object(_) => {
                let values = rhai::serde::to_dynamic(value)?
                    .try_cast::<Map>()
                    .ok_or_else(|| TemplateError::evaluation("JSON object did not convert to a map"))?;
                Ok(Self::from(values))
            }
            other => Err(TemplateError::evaluation(format!(
                "template input must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Waits for every pending value. The first failure wins.
    pub async fn resolve(self) -> Result<Map, TemplateError> {
        let Locals {
            mut values,
            pending,
        } = self;
        let (names, futures): (Vec<String>, Vec<PendingValue>) = pending.into_iter().unzip();
        let resolved = try_join_all(futures).await?;
        for (name, value) in names.into_iter().zip(resolved) {
            values.insert(name.into(), value);
        }
        Ok(values)
    }
}

/// A compiled, callable template.
pub struct Template {
    engine: Engine,
    ast: AST,
    entry: FnPtr,
    source: String,
    is_async: bool,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .field("is_async", &self.is_async)
            .finish()
    }
}

impl Template {
    /// Instantiates artifact source in the artifact sandbox.
    pub fn load(source: impl Into<String>, is_async: bool) -> Result<Self, TemplateError> {
        let source = source.into();
        let engine = Sandbox::artifact().into_engine();
        let ast = engine.compile(&source).map_err(|err| {
            TemplateError::evaluation(format!("generated template does not parse: {err}"))
        })?;
        let entry = engine.eval_ast::<FnPtr>(&ast)?;
        Ok(Template {
            engine,
            ast,
            entry,
            source,
            is_async,
        })
    }

    /// The artifact source this template was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Renders with `locals`, which must not hold pending values.
    pub fn render(&self, locals: Locals) -> Result<String, TemplateError> {
        if let Some((name, _)) = locals.pending.first() {
            return Err(TemplateError::evaluation(format!(
                "`{name}` is still pending; render it with an asynchronous template"
            )));
        }
        self.call(locals.values)
    }

    pub fn render_json(&self, value: &serde_json::Value) -> Result<String, TemplateError> {
        self.render(Locals::from_json(value)?)
    }

    /// Resolves pending values, then renders. Only asynchronous templates accept pending values.
    pub async fn render_async(&self, locals: Locals) -> Result<String, TemplateError> {
        if !self.is_async {
            return self.render(locals);
        }
        let values = locals.resolve().await?;
        self.call(values)
    }

    fn call(&self, locals: Map) -> Result<String, TemplateError> {
        Ok(self
            .entry
            .call::<String>(&self.engine, &self.ast, (locals,))?)
    }
}
