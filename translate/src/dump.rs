//! Human and machine readable renderings of fragments.
use crate::{DumpFormat, ProcFrag};
use frame::Access;
use itertools::Itertools;
use serde_derive::Serialize;
use tree::Stm;

#[derive(Serialize)]
struct FragmentDump<'a> {
    name: &'a str,
    formals: &'a [Access],
    locals: &'a [Access],
    body: &'a Stm,
}

pub fn render(fragment: &ProcFrag, format: DumpFormat) -> Result<String, serde_json::Error> {
    match format {
        DumpFormat::Text => Ok(render_text(fragment)),
        DumpFormat::Json => serde_json::to_string_pretty(&FragmentDump {
            name: fragment.name(),
            formals: fragment.frame.formals(),
            locals: fragment.frame.locals(),
            body: &fragment.body,
        }),
    }
}

fn render_text(fragment: &ProcFrag) -> String {
    let body = fragment
        .linearized()
        .iter()
        .map(|stm| match stm {
            Stm::Label(label) => format!("{}:", label),
            stm => format!("    {}", stm),
        })
        .join("\n");
    format!(
        "PROC {} ({} formals, {} locals)\n{}",
        fragment.name(),
        fragment.frame.formals().len(),
        fragment.frame.locals().len(),
        body
    )
}

/// Log every fragment at info level.
pub fn log_fragments(fragments: &[ProcFrag], format: DumpFormat) {
    for fragment in fragments {
        match render(fragment, format) {
            Ok(dump) => log::info!("{}", dump),
            Err(err) => log::warn!("cannot dump fragment {}: {}", fragment.name(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::{FrameFactory, JvmFrameFactory};
    use tree::{Expr, Label, TempFactory};

    fn fragment() -> ProcFrag {
        let mut temps = TempFactory::new();
        let frame = JvmFrameFactory.new_frame(Label::new("A$m"), &[false], &mut temps);
        let body = frame.proc_entry_exit1(Stm::mov(Expr::Temp(frame.rv()), Expr::Const(1)));
        ProcFrag { frame, body }
    }

    #[test]
    fn text_lists_linear_statements() {
        let text = render(&fragment(), DumpFormat::Text).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!("PROC A$m (1 formals, 0 locals)", lines[0]);
        assert_eq!("A$m:", lines[1]);
        assert_eq!("    MOVE(TEMP(t1), CONST(1))", lines[2]);
        assert_eq!("A$m$end:", lines[3]);
    }

    #[test]
    fn json_names_the_fragment() {
        let json = render(&fragment(), DumpFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!("A$m", value["name"]);
        assert_eq!(4, value["formals"][0]["InFrame"]);
    }
}
