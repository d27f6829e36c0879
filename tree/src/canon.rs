//! Straighten a statement tree into a list of canonical statements.
//!
//! The result contains no `ESEQ` and no `SEQ`. Every side effect nested in
//! an expression is hoisted in front of the statement containing it. When a
//! hoisted statement might change the value of an expression evaluated
//! earlier, that value is first saved in a fresh temp.
use crate::{
    ir::{Expr, Stm},
    temp::{Temp, TempFactory},
};

pub fn linearize(stm: Stm) -> Vec<Stm> {
    let first_free = max_temp_stm(&stm).map_or(0, |temp| temp.index() + 1);
    let mut canon = Canon {
        temps: TempFactory::starting_at(first_free),
    };
    let stm = canon.do_stm(stm);

    let mut out = Vec::new();
    flatten(stm, &mut out);
    log::trace!("linearized into {} statements", out.len());
    out
}

struct Canon {
    temps: TempFactory,
}

impl Canon {
    fn do_stm(&mut self, stm: Stm) -> Stm {
        match stm {
            Stm::Seq(first, rest) => seq(self.do_stm(*first), self.do_stm(*rest)),
            Stm::Jump(target, labels) => {
                let (prefix, mut exprs) = self.reorder(vec![*target]);
                seq(prefix, Stm::Jump(Box::new(pop(&mut exprs)), labels))
            }
            Stm::CJump {
                op,
                left,
                right,
                if_true,
                if_false,
            } => {
                let (prefix, mut exprs) = self.reorder(vec![*left, *right]);
                let right = pop(&mut exprs);
                let left = pop(&mut exprs);
                seq(prefix, Stm::cjump(op, left, right, if_true, if_false))
            }
            Stm::Move(dst, src) => match *dst {
                Expr::Temp(temp) => {
                    let (prefix, mut exprs) = self.reorder(vec![*src]);
                    seq(prefix, Stm::mov(Expr::Temp(temp), pop(&mut exprs)))
                }
                Expr::Mem(address) => {
                    let (prefix, mut exprs) = self.reorder(vec![*address, *src]);
                    let src = pop(&mut exprs);
                    let address = pop(&mut exprs);
                    seq(prefix, Stm::mov(Expr::mem(address), src))
                }
                Expr::ESeq(stm, dst) => self.do_stm(Stm::seq(*stm, Stm::Move(dst, src))),
                // any other destination is an address computation
                dst => {
                    let (prefix, mut exprs) = self.reorder(vec![dst, *src]);
                    let src = pop(&mut exprs);
                    let dst = pop(&mut exprs);
                    seq(prefix, Stm::mov(dst, src))
                }
            },
            Stm::Exp(expr) => {
                let (prefix, mut exprs) = self.reorder(vec![*expr]);
                seq(prefix, Stm::exp(pop(&mut exprs)))
            }
            Stm::Label(label) => Stm::Label(label),
        }
    }

    fn do_exp(&mut self, expr: Expr) -> (Stm, Expr) {
        match expr {
            Expr::BinOp(op, lhs, rhs) => {
                let (prefix, mut exprs) = self.reorder(vec![*lhs, *rhs]);
                let rhs = pop(&mut exprs);
                let lhs = pop(&mut exprs);
                (prefix, Expr::binop(op, lhs, rhs))
            }
            Expr::Mem(address) => {
                let (prefix, mut exprs) = self.reorder(vec![*address]);
                (prefix, Expr::mem(pop(&mut exprs)))
            }
            Expr::ESeq(stm, expr) => {
                let stm = self.do_stm(*stm);
                let (prefix, expr) = self.do_exp(*expr);
                (seq(stm, prefix), expr)
            }
            Expr::Call(target, args) => {
                let mut operands = Vec::with_capacity(args.len() + 1);
                operands.push(*target);
                operands.extend(args);
                let (prefix, mut exprs) = self.reorder(operands);
                let target = exprs.remove(0);
                (prefix, Expr::call(target, exprs))
            }
            leaf => (Stm::nop(), leaf),
        }
    }

    /// Pull the side effects out of `exprs`, preserving evaluation order.
    fn reorder(&mut self, exprs: Vec<Expr>) -> (Stm, Vec<Expr>) {
        let mut prefixes = Vec::with_capacity(exprs.len());
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let (prefix, value) = self.do_exp(expr);
            prefixes.push(prefix);
            values.push(value);
        }

        // Walk backwards: a value must be saved if any later prefix could
        // change it.
        let mut later = Stm::nop();
        for i in (0..values.len()).rev() {
            if !commutes(&later, &values[i]) {
                let temp = self.temps.new_temp();
                let value = std::mem::replace(&mut values[i], Expr::Temp(temp));
                later = seq(Stm::mov(Expr::Temp(temp), value), later);
            }
            let prefix = std::mem::replace(&mut prefixes[i], Stm::nop());
            later = seq(prefix, later);
        }
        (later, values)
    }
}

fn pop(exprs: &mut Vec<Expr>) -> Expr {
    exprs
        .pop()
        .unwrap_or_else(|| unreachable!("reorder returns one value per operand"))
}

/// Conservative: only constants and names are immune to side effects.
fn commutes(stm: &Stm, expr: &Expr) -> bool {
    if stm.is_nop() {
        return true;
    }
    match expr {
        Expr::Const(_) | Expr::LongConst(_) | Expr::Name(_) => true,
        _ => false,
    }
}

fn seq(first: Stm, rest: Stm) -> Stm {
    if first.is_nop() {
        rest
    } else if rest.is_nop() {
        first
    } else {
        Stm::seq(first, rest)
    }
}

fn flatten(stm: Stm, out: &mut Vec<Stm>) {
    match stm {
        Stm::Seq(first, rest) => {
            flatten(*first, out);
            flatten(*rest, out);
        }
        stm if stm.is_nop() => (),
        stm => out.push(stm),
    }
}

fn max_temp_stm(stm: &Stm) -> Option<Temp> {
    match stm {
        Stm::Move(dst, src) => max_temp_exp(dst).max(max_temp_exp(src)),
        Stm::Exp(expr) | Stm::Jump(expr, _) => max_temp_exp(expr),
        Stm::CJump { left, right, .. } => max_temp_exp(left).max(max_temp_exp(right)),
        Stm::Seq(first, rest) => max_temp_stm(first).max(max_temp_stm(rest)),
        Stm::Label(_) => None,
    }
}

fn max_temp_exp(expr: &Expr) -> Option<Temp> {
    match expr {
        Expr::Temp(temp) => Some(*temp),
        Expr::BinOp(_, lhs, rhs) => max_temp_exp(lhs).max(max_temp_exp(rhs)),
        Expr::Mem(address) => max_temp_exp(address),
        Expr::Call(target, args) => args
            .iter()
            .map(max_temp_exp)
            .fold(max_temp_exp(target), |max, temp| max.max(temp)),
        Expr::ESeq(stm, expr) => max_temp_stm(stm).max(max_temp_exp(expr)),
        Expr::Const(_) | Expr::LongConst(_) | Expr::Name(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinOp, Label};
    use utils::assert_matches;

    fn temps() -> (Temp, Temp) {
        let mut factory = TempFactory::new();
        (factory.new_temp(), factory.new_temp())
    }

    fn no_eseq(stm: &Stm) -> bool {
        fn exp_ok(expr: &Expr) -> bool {
            match expr {
                Expr::ESeq(..) => false,
                Expr::BinOp(_, l, r) => exp_ok(l) && exp_ok(r),
                Expr::Mem(a) => exp_ok(a),
                Expr::Call(t, args) => exp_ok(t) && args.iter().all(exp_ok),
                _ => true,
            }
        }
        match stm {
            Stm::Seq(..) => false,
            Stm::Move(d, s) => exp_ok(d) && exp_ok(s),
            Stm::Exp(e) | Stm::Jump(e, _) => exp_ok(e),
            Stm::CJump { left, right, .. } => exp_ok(left) && exp_ok(right),
            Stm::Label(_) => true,
        }
    }

    #[test]
    fn flattens_sequences_and_drops_nops() {
        let stm = seq![
            Stm::Label(Label::new("a")),
            Stm::nop(),
            seq![Stm::Label(Label::new("b")), Stm::Label(Label::new("c"))]
        ];
        let out = linearize(stm);
        assert_eq!(3, out.len());
        assert!(out.iter().all(no_eseq));
    }

    #[test]
    fn hoists_eseq_in_front_of_its_statement() {
        let (a, b) = temps();
        // MOVE(a, ESEQ(MOVE(b, 1), b + 2))
        let stm = Stm::mov(
            Expr::Temp(a),
            Expr::eseq(
                Stm::mov(Expr::Temp(b), Expr::Const(1)),
                Expr::binop(BinOp::Plus, Expr::Temp(b), Expr::Const(2)),
            ),
        );
        let out = linearize(stm);
        assert_eq!(2, out.len());
        assert_eq!(Stm::mov(Expr::Temp(b), Expr::Const(1)), out[0]);
        assert_matches!(&out[1], Stm::Move(..));
    }

    #[test]
    fn saves_operand_clobbered_by_later_effect() {
        let (a, b) = temps();
        // BINOP(PLUS, a, ESEQ(MOVE(a, 5), b)): `a` must be read before the move
        let stm = Stm::mov(
            Expr::Temp(b),
            Expr::binop(
                BinOp::Plus,
                Expr::Temp(a),
                Expr::eseq(Stm::mov(Expr::Temp(a), Expr::Const(5)), Expr::Temp(b)),
            ),
        );
        let out = linearize(stm);
        assert_eq!(3, out.len());
        match &out[0] {
            Stm::Move(dst, src) => {
                assert_eq!(Expr::Temp(a), **src);
                // the fresh temp does not collide with temps in the input
                match **dst {
                    Expr::Temp(saved) => assert!(saved.index() > b.index()),
                    ref other => panic!("unexpected {}", other),
                }
            }
            other => panic!("unexpected {}", other),
        }
    }
}
