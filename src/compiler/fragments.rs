/// Name of the compiler-program function returning a fragment by index.
pub const FRAGMENT_FN: &str = "__x";

/// Generated artifact code, addressed by index from the compiler program.
///
/// The compiler program only carries `write(__x(i))` calls. Template text
/// never appears in it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FragmentTable {
    fragments: Vec<String>,
}

impl FragmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `code`, returning its index.
    pub fn push(&mut self, code: String) -> usize {
        self.fragments.push(code);
        self.fragments.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Compiler-program statement appending fragment `index` to the artifact body.
    pub fn write_statement(index: usize) -> String {
        format!("write({FRAGMENT_FN}({index}))")
    }
}
