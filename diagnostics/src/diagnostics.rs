//! MiniJava diagnostics and the sink collecting them.
//!
//! A diagnostic is a `(line, column, kind, args)` tuple rendered as
//! `[line,column] error: <message>`. The message is the kind's template with
//! every `{}` replaced by the next argument.
//!
//! Two diagnostics compare equal if their kinds are equal. A diagnostic also
//! compares equal to a bare [`ErrorKind`]. Tests usually only care about
//! *which* diagnostic fired, not where or with which arguments.
//!
//! This implementation is NOT thread-safe.
use failure::Fail;
use std::{
    cell::{Ref, RefCell},
    fmt,
};
use termcolor::{Color, ColorSpec, WriteColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateClass,
    DuplicateField,
    DuplicateMethod,
    DuplicateParameter,
    DuplicateVariable,
    UndefinedClass,
    UndefinedSymbol,
    UndefinedMethod,
    CyclicInheritance,
    InvalidAssignment,
    InvalidOperands,
    InvalidCondition,
    InvalidReturnType,
    WrongArgumentCount,
    Internal,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        use self::ErrorKind::*;
        match self {
            DuplicateClass => "duplicate class '{}'",
            DuplicateField => "duplicate field '{}' in class '{}'",
            DuplicateMethod => "duplicate method '{}' in class '{}'",
            DuplicateParameter => "duplicate parameter '{}' in method '{}'",
            DuplicateVariable => "variable '{}' is already defined in this block",
            UndefinedClass => "cannot find class '{}'",
            UndefinedSymbol => "cannot find symbol '{}'",
            UndefinedMethod => "cannot find method '{}' in class '{}'",
            CyclicInheritance => "cyclic inheritance involving '{}'",
            InvalidAssignment => "incompatible types: '{}' cannot be assigned to '{}'",
            InvalidOperands => "bad operand types '{}' and '{}' for operator '{}'",
            InvalidCondition => "condition must be of type boolean, found '{}'",
            InvalidReturnType => "incompatible return type '{}', expected '{}'",
            WrongArgumentCount => "method '{}' expects {} arguments, found {}",
            Internal => "internal compiler error: {}",
        }
    }

    /// Create a diagnostic of this kind at the given source location.
    pub fn on(self, line: usize, column: usize, args: Vec<String>) -> MiniJavaError {
        MiniJavaError {
            line,
            column,
            kind: self,
            args,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MiniJavaError {
    pub line: usize,
    pub column: usize,
    pub kind: ErrorKind,
    pub args: Vec<String>,
}

impl MiniJavaError {
    /// The kind's message template with the arguments filled in.
    ///
    /// Surplus arguments are ignored, missing ones leave the `{}` in place.
    pub fn message(&self) -> String {
        let template = self.kind.message();
        let mut args = self.args.iter();
        let mut message = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(idx) = rest.find("{}") {
            message.push_str(&rest[..idx]);
            match args.next() {
                Some(arg) => message.push_str(arg),
                None => message.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        message.push_str(rest);
        message
    }
}

impl fmt::Display for MiniJavaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}] error: {}", self.line, self.column, self.message())
    }
}

impl Fail for MiniJavaError {}

impl PartialEq for MiniJavaError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl PartialEq<ErrorKind> for MiniJavaError {
    fn eq(&self, kind: &ErrorKind) -> bool {
        self.kind == *kind
    }
}

impl PartialEq<MiniJavaError> for ErrorKind {
    fn eq(&self, error: &MiniJavaError) -> bool {
        *self == error.kind
    }
}

/// Instead of writing diagnostics generated by the different passes
/// directly to stderr, they are collected in this object and echoed to the
/// writer given in the constructor.
pub struct Diagnostics {
    errors: RefCell<Vec<MiniJavaError>>,
    writer: RefCell<Box<dyn WriteColor>>,
}

impl Diagnostics {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            errors: RefCell::new(Vec::new()),
            writer: RefCell::new(writer),
        }
    }

    /// A sink whose output goes to an in-memory buffer nobody reads.
    pub fn dummy() -> Self {
        Self::new(Box::new(termcolor::Buffer::no_color()))
    }

    pub fn error(&self, error: MiniJavaError) {
        {
            let mut writer = self.writer.borrow_mut();
            write_colored(&mut **writer, &error);
        }
        self.errors.borrow_mut().push(error);
    }

    /// True when at least one error was reported.
    pub fn errored(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub fn count(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn errors(&self) -> Ref<'_, Vec<MiniJavaError>> {
        self.errors.borrow()
    }

    pub fn write_statistics(&self) {
        let mut writer = self.writer.borrow_mut();
        let mut output = ColorOutput::new(&mut **writer);
        output.set_bold(true);

        if self.errored() {
            output.set_color(Some(Color::Red));
            let summary = match self.count() {
                1 => "an error".to_string(),
                n => format!("{} errors", n),
            };
            writeln!(output.writer(), "Compilation aborted due to {}", summary).ok();
        } else {
            output.set_color(Some(Color::Green));
            writeln!(output.writer(), "Compilation finished successfully").ok();
        }
    }
}

fn write_colored(writer: &mut dyn WriteColor, error: &MiniJavaError) {
    let mut output = ColorOutput::new(writer);
    write!(output.writer(), "[{},{}] ", error.line, error.column).ok();

    output.set_color(Some(Color::Red));
    output.set_bold(true);
    write!(output.writer(), "error:").ok();

    output.set_color(None);
    output.set_bold(false);
    writeln!(output.writer(), " {}", error.message()).ok();
}

/// Calls to functions should pass the raw writer, each function should
/// create its own `ColorOutput` object that is dropped on return. This
/// guarantees correct coloring in nested calls.
struct ColorOutput<'a> {
    writer: &'a mut dyn WriteColor,
    spec: ColorSpec,
}

impl<'a> ColorOutput<'a> {
    fn new(writer: &'a mut dyn WriteColor) -> Self {
        writer.reset().ok();

        Self {
            writer,
            spec: ColorSpec::new(),
        }
    }

    fn set_color(&mut self, color: Option<Color>) {
        // ignore coloring failures using ok()
        self.spec.set_fg(color);
        self.writer.set_color(&self.spec).ok();
    }

    fn set_bold(&mut self, yes: bool) {
        self.spec.set_bold(yes);
        self.writer.set_color(&self.spec).ok();
    }

    fn writer(&mut self) -> &mut dyn WriteColor {
        self.writer
    }
}

/// Reset to no color, otherwise code that is not color aware prints
/// everything in the color last used.
impl<'a> Drop for ColorOutput<'a> {
    fn drop(&mut self) {
        self.writer.reset().ok();
    }
}
