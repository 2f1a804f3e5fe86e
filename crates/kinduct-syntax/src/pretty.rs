//! Serializer for the script AST.
//!
//! Output re-parses to a structurally equal AST (spans aside). Attached
//! documentation comments are re-emitted above their command.

use crate::ast::*;
use num::{BigInt, BigRational, Integer, One, Signed, Zero};

/// Pretty print a script to a string.
pub fn pretty_print(script: &Script) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_script(script);
    printer.output
}

/// Pretty print a single command.
pub fn pretty_print_command(command: &Command) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_command(command);
    printer.output
}

/// Pretty print an expression on one line.
pub fn pretty_print_expr(expr: &Expr) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_expr(expr);
    printer.output
}

/// Format an integer as an SMT-LIB literal; negatives become `(- n)`.
pub fn format_integer(n: &BigInt) -> String {
    if n.is_negative() {
        format!("(- {})", n.abs())
    } else {
        n.to_string()
    }
}

/// Format a rational as an SMT-LIB literal.
///
/// Terminating fractions print as decimals (`2.5`), others as `(/ 1.0 3.0)`.
/// Negatives are wrapped in `(- ...)`.
pub fn format_rational(r: &BigRational) -> String {
    if r.is_negative() {
        return format!("(- {})", format_rational(&r.abs()));
    }
    match decimal_digits(r) {
        Some(text) => text,
        None => format!("(/ {}.0 {}.0)", r.numer(), r.denom()),
    }
}

/// Exact decimal expansion of a non-negative rational, if it terminates.
fn decimal_digits(r: &BigRational) -> Option<String> {
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut rest = r.denom().clone();
    let (mut twos, mut fives) = (0usize, 0usize);
    while rest.is_even() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return None;
    }

    let places = twos.max(fives).max(1);
    let scaled = r.numer() * num::pow(BigInt::from(10), places) / r.denom();
    let digits = scaled.to_string();
    let digits = format!("{:0>width$}", digits, width = places + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - places);
    Some(format!("{}.{}", int_part, frac_part))
}

struct PrettyPrinter {
    output: String,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }

    fn print_script(&mut self, script: &Script) {
        for (i, command) in script.commands.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.print_command(command);
        }
    }

    fn print_doc(&mut self, doc: &[String]) {
        for line in doc {
            if line.is_empty() {
                self.writeln(";");
            } else {
                self.writeln(&format!("; {}", line));
            }
        }
    }

    fn print_command(&mut self, command: &Command) {
        self.print_doc(command.doc());
        match command {
            Command::DefineFun(d) => self.print_define_fun(d),
            Command::DeclareFun(d) => {
                self.writeln(&format!(
                    "(declare-fun {} () {})",
                    d.name.name, d.sort.name.name
                ));
            }
            Command::DefineSys(d) => self.print_define_sys(d),
            Command::DefineProp(d) => {
                self.write(&format!("(define-prop {} {}\n  ", d.name.name, d.system.name));
                self.print_expr(&d.body);
                self.writeln(")");
            }
            Command::DefineRel(d) => {
                self.write(&format!("(define-rel {} {}\n  ", d.name.name, d.system.name));
                self.print_expr(&d.body);
                match d.mode {
                    Some(RelMode::Assume) => self.write(" :assume"),
                    Some(RelMode::Prove) => self.write(" :prove"),
                    None => {}
                }
                self.writeln(")");
            }
            Command::Verify(d) => {
                let names: Vec<&str> = d.names.iter().map(|n| n.name.as_str()).collect();
                self.writeln(&format!("(verify {} ({}))", d.system.name, names.join(" ")));
            }
        }
    }

    fn print_define_fun(&mut self, d: &FunDecl) {
        self.write(&format!("(define-fun {} (", d.name.name));
        self.print_sorted_vars(&d.params);
        self.write(&format!(") {}\n  ", d.ret.name.name));
        self.print_expr(&d.body);
        self.writeln(")");
    }

    fn print_define_sys(&mut self, d: &SysDecl) {
        self.write(&format!("(define-sys {} (", d.name.name));
        self.print_sorted_vars(&d.state);
        self.write(")\n  ");
        self.print_expr(&d.init);
        self.write("\n  ");
        self.print_expr(&d.trans);
        self.write("\n  (");
        for (i, call) in d.subsystems.iter().enumerate() {
            if i > 0 {
                self.write("\n   ");
            }
            self.write(&format!("({}", call.system.name));
            for arg in &call.args {
                self.write(" ");
                self.print_expr(arg);
            }
            self.write(")");
        }
        self.writeln("))");
    }

    fn print_sorted_vars(&mut self, vars: &[SortedVar]) {
        for (i, var) in vars.iter().enumerate() {
            if i > 0 {
                self.write(" ");
            }
            self.write(&format!("({} {})", var.name.name, var.sort.name.name));
        }
    }

    fn print_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Numeral(n) => self.write(&format_integer(n)),
            ExprKind::Decimal(r) => self.write(&format_rational(r)),
            ExprKind::Symbol(s) => self.write(s),
            ExprKind::Staged { stage, var } => {
                let tag = match stage {
                    StageTag::Curr => "curr",
                    StageTag::Next => "next",
                };
                self.write(&format!("(_ {} {})", tag, var.name));
            }
            ExprKind::App { head, args } => {
                self.write("(");
                self.write(&head.name);
                for arg in args {
                    self.write(" ");
                    self.print_expr(arg);
                }
                self.write(")");
            }
            ExprKind::Let { bindings, body } => {
                self.write("(let (");
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        self.write(" ");
                    }
                    self.write(&format!("({} ", name.name));
                    self.print_expr(value);
                    self.write(")");
                }
                self.write(") ");
                self.print_expr(body);
                self.write(")");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_expr};

    fn roundtrip(source: &str) {
        let script = parse(source).unwrap();
        let printed = pretty_print(&script);
        let reparsed = parse(&printed)
            .unwrap_or_else(|e| panic!("re-parse failed: {}\n---\n{}", e, printed));
        let printed_again = pretty_print(&reparsed);
        assert_eq!(printed, printed_again);
        assert_eq!(script.commands.len(), reparsed.commands.len());
    }

    #[test]
    fn test_roundtrip_system() {
        roundtrip(
            r#"
; node toggle (in: bool) returns (out: int)
(define-sys toggle ((in Bool) (out Int))
  (= (_ curr out) 0)
  (= (_ next out) (ite (distinct (_ next in) (_ curr in)) (+ (_ curr out) 1) (_ curr out))))
(define-prop bounded toggle (<= (_ curr out) 10))
(define-rel mono toggle (>= (_ next out) (_ curr out)) :assume)
(verify toggle (bounded mono))
"#,
        );
    }

    #[test]
    fn test_roundtrip_macros_and_subsystems() {
        roundtrip(
            r#"
(define-fun delta () Real 0.25)
(define-fun within ((a Real) (b Real)) Bool (let ((d (- a b))) (and (<= d delta) (>= d (- delta)))))
(declare-fun seed () Int)
(define-sys child ((v Real)) true (within (_ next v) (_ curr v)))
(define-sys parent ((x Real) (y Real))
  (= (_ curr x) 0.0)
  true
  ((child (_ curr x)) (child (+ (_ curr x) (_ curr y)))))
"#,
        );
    }

    #[test]
    fn test_doc_comments_are_emitted() {
        let script = parse("; first\n;\n; third\n(verify s (p))").unwrap();
        let printed = pretty_print(&script);
        assert_eq!(printed, "; first\n;\n; third\n(verify s (p))\n");
    }

    #[test]
    fn test_format_integer() {
        assert_eq!(format_integer(&BigInt::from(5)), "5");
        assert_eq!(format_integer(&BigInt::from(-5)), "(- 5)");
    }

    #[test]
    fn test_format_rational() {
        let r = |n: i64, d: i64| BigRational::new(n.into(), d.into());
        assert_eq!(format_rational(&r(5, 2)), "2.5");
        assert_eq!(format_rational(&r(3, 1)), "3.0");
        assert_eq!(format_rational(&r(1, 8)), "0.125");
        assert_eq!(format_rational(&r(1, 20)), "0.05");
        assert_eq!(format_rational(&r(-1, 4)), "(- 0.25)");
        assert_eq!(format_rational(&r(1, 3)), "(/ 1.0 3.0)");
        assert_eq!(format_rational(&r(0, 1)), "0.0");
    }

    #[test]
    fn test_expr_printing() {
        let expr = parse_expr("(let ((a (_ curr x))) (ite (> a 0) a (- a)))").unwrap();
        assert_eq!(
            pretty_print_expr(&expr),
            "(let ((a (_ curr x))) (ite (> a 0) a (- a)))"
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_rational_literals_reprint(n in -100_000i64..100_000, d in 1i64..1_000) {
            let text = format_rational(&BigRational::new(n.into(), d.into()));
            let expr = parse_expr(&text).unwrap();
            proptest::prop_assert_eq!(pretty_print_expr(&expr), text);
        }
    }
}
