use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Runtime routines the translator may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RuntimeFunction {
    Println,
    New,
    NewArray,
    ArrayLength,
}

pub trait RTLib {
    fn ld_name(&self, function: RuntimeFunction) -> &'static str;
}

/// The support library linked to every MiniJava program.
pub struct MiniJavaLib;

impl RTLib for MiniJavaLib {
    fn ld_name(&self, function: RuntimeFunction) -> &'static str {
        match function {
            RuntimeFunction::Println => "_minijavalib_println",
            RuntimeFunction::New => "_minijavalib_new",
            RuntimeFunction::NewArray => "_minijavalib_newarray",
            RuntimeFunction::ArrayLength => "_minijavalib_arraylength",
        }
    }
}

/// Name routines after the JVM members or instructions implementing them.
pub struct JvmLib;

impl RTLib for JvmLib {
    fn ld_name(&self, function: RuntimeFunction) -> &'static str {
        match function {
            RuntimeFunction::Println => "java/io/PrintStream/println(I)V",
            RuntimeFunction::New => "new",
            RuntimeFunction::NewArray => "newarray",
            RuntimeFunction::ArrayLength => "arraylength",
        }
    }
}

/// Configuration-level choice of runtime library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeLib {
    MiniJava,
    Jvm,
}

impl Default for RuntimeLib {
    fn default() -> Self {
        RuntimeLib::MiniJava
    }
}

impl RuntimeLib {
    pub fn lib(self) -> Box<dyn RTLib> {
        match self {
            RuntimeLib::MiniJava => Box::new(MiniJavaLib),
            RuntimeLib::Jvm => Box::new(JvmLib),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn every_function_has_a_distinct_name() {
        for lib in &[RuntimeLib::MiniJava, RuntimeLib::Jvm] {
            let lib = lib.lib();
            let names: HashSet<_> = RuntimeFunction::iter().map(|f| lib.ld_name(f)).collect();
            assert_eq!(RuntimeFunction::iter().count(), names.len());
        }
    }

    #[test]
    fn println_uses_the_minijava_library_by_default() {
        let lib = RuntimeLib::default().lib();
        assert_eq!("_minijavalib_println", lib.ld_name(RuntimeFunction::Println));
    }
}
