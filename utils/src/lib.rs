//! Helpers shared by all crates of the middle end.

/// Assert that an expression matches one of the given patterns.
///
/// Unlike `assert!(matches!(..))`, the failure message contains the
/// debug representation of the value that did not match.
#[macro_export]
macro_rules! assert_matches {
    ($expression: expr, $( $pattern: pat )|+) => {{
        match $expression {
            $( $pattern )|+ => (),
            expression => panic!(
                r#"assertion failed: `(if let pattern = expression), {}:{}:{}`
pattern: `{}`,
expression: `{:?}`"#,
                file!(),
                line!(),
                column!(),
                stringify!($( $pattern )|+),
                expression
            ),
        }
    }};
}

/// Monotonic counter handing out consecutive ids starting at zero.
///
/// Used wherever the middle end needs "the next" number: block ids in the
/// scope tracker, temporaries and labels in the IR.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    next: usize,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }

    /// Continue counting at `start`.
    pub fn starting_at(start: usize) -> Self {
        Counter { next: start }
    }

    pub fn next(&mut self) -> usize {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The value the next call to `next` will return.
    pub fn peek(&self) -> usize {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}
