use crate::{Access, Frame, FrameFactory};
use tree::{Label, Temp, TempFactory};

const WORD_SIZE: i32 = 4;

/// A JVM method frame: numbered local variable slots, slot 0 holds the
/// receiver.
#[derive(Debug)]
pub struct JvmFrame {
    name: Label,
    formals: Vec<Access>,
    locals: Vec<Access>,
    next_slot: i32,
    fp: Temp,
    rv: Temp,
}

impl JvmFrame {
    pub fn new(name: Label, formals: &[bool], temps: &mut TempFactory) -> Self {
        // formals always live in their incoming slot
        let formals: Vec<_> = (1..=formals.len() as i32)
            .map(|slot| Access::InFrame(slot * WORD_SIZE))
            .collect();
        let next_slot = formals.len() as i32 + 1;
        log::trace!("frame {} with {} formals", name, formals.len());

        JvmFrame {
            name,
            formals,
            locals: Vec::new(),
            next_slot,
            fp: temps.new_temp(),
            rv: temps.new_temp(),
        }
    }

    /// Number of slots in use, including the receiver.
    pub fn slots(&self) -> i32 {
        self.next_slot
    }
}

impl Frame for JvmFrame {
    fn name(&self) -> &Label {
        &self.name
    }

    fn formals(&self) -> &[Access] {
        &self.formals
    }

    fn locals(&self) -> &[Access] {
        &self.locals
    }

    fn alloc_local(&mut self, escapes: bool, temps: &mut TempFactory) -> Access {
        let access = if escapes {
            let slot = self.next_slot;
            self.next_slot += 1;
            Access::InFrame(slot * WORD_SIZE)
        } else {
            Access::InReg(temps.new_temp())
        };
        self.locals.push(access);
        access
    }

    fn fp(&self) -> Temp {
        self.fp
    }

    fn rv(&self) -> Temp {
        self.rv
    }

    fn word_size(&self) -> i32 {
        WORD_SIZE
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JvmFrameFactory;

impl FrameFactory for JvmFrameFactory {
    fn new_frame(&self, name: Label, formals: &[bool], temps: &mut TempFactory) -> Box<dyn Frame> {
        Box::new(JvmFrame::new(name, formals, temps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree::{BinOp, Expr, Stm};
    use utils::assert_matches;

    #[test]
    fn formals_follow_the_receiver_slot() {
        let mut temps = TempFactory::new();
        let frame = JvmFrame::new(Label::new("Foo$bar"), &[false, true], &mut temps);
        assert_eq!(&[Access::InFrame(4), Access::InFrame(8)], frame.formals());
        assert_eq!(3, frame.slots());
    }

    #[test]
    fn locals_in_allocation_order() {
        let mut temps = TempFactory::new();
        let mut frame = JvmFrame::new(Label::new("Foo$bar"), &[false], &mut temps);
        let reg = frame.alloc_local(false, &mut temps);
        let slot = frame.alloc_local(true, &mut temps);

        assert_matches!(reg, Access::InReg(_));
        assert_eq!(Access::InFrame(8), slot);
        assert_eq!(&[reg, slot], frame.locals());
        assert_ne!(Access::InReg(frame.fp()), reg);
    }

    #[test]
    fn access_reads_relative_to_frame_pointer() {
        let mut temps = TempFactory::new();
        let frame = JvmFrameFactory.new_frame(Label::new("A$m"), &[false], &mut temps);
        let fp = Expr::Temp(frame.fp());
        assert_eq!(
            Expr::mem(Expr::binop(BinOp::Plus, fp.clone(), Expr::Const(4))),
            frame.formals()[0].exp(fp)
        );
    }

    #[test]
    fn body_is_bracketed_by_entry_and_exit() {
        let mut temps = TempFactory::new();
        let frame = JvmFrameFactory.new_frame(Label::new("A$m"), &[], &mut temps);
        let body = frame.proc_entry_exit1(Stm::nop());
        assert_eq!(
            "SEQ(LABEL(A$m), SEQ(EXP(CONST(0)), LABEL(A$m$end)))",
            body.to_string()
        );
    }

    #[test]
    fn external_call_targets_a_name() {
        let mut temps = TempFactory::new();
        let frame = JvmFrameFactory.new_frame(Label::new("A$m"), &[], &mut temps);
        let call = frame.external_call("print", vec![Expr::Const(1)]);
        assert_eq!("CALL(NAME(print), CONST(1))", call.to_string());
    }
}
