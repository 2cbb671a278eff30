//! Tree-walking interpreter
//!
//! The interpreter sees the cart only through [`Value`] handles and can only
//! influence the result through its [`EffectAccumulator`]. Every statement,
//! expression node and loop iteration is charged to the [`StepBudget`].

use std::cmp::Ordering;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rustc_hash::FxHashMap;

use crate::{
    cart::{CartSnapshot, LineItem},
    effects::{EffectAccumulator, MutationEvent, ProposalOptions},
    script::{
        ast::{Arg, BinaryOp, Expr, ExprKind, LogicalOp, Program, Stmt, StmtKind, UnaryOp},
        error::{Position, RuntimeError, ScriptError},
        limits::{ExecutionLimits, StepBudget},
        value::Value,
    },
};

/// Names bound by the host. They cannot be declared or assigned.
const RESERVED: [&str; 2] = ["cart", "Input"];

/// Decimal places accepted by `round`.
const MAX_ROUND_DP: u32 = 28;

/// A run that finished normally.
#[derive(Debug)]
pub(crate) struct Execution {
    pub(crate) events: Vec<MutationEvent>,
    pub(crate) steps: u64,
}

/// Run `program` against `cart` with a fresh accumulator.
pub(crate) fn execute(
    program: &Program,
    cart: &CartSnapshot,
    limits: &ExecutionLimits,
) -> Result<Execution, ScriptError> {
    let mut interpreter = Interpreter {
        cart,
        max_string_bytes: limits.max_string_bytes,
        budget: StepBudget::start(limits),
        scopes: vec![FxHashMap::default()],
        effects: EffectAccumulator::new(limits.max_proposals),
        loop_depth: 0,
    };

    // `break` and `continue` fault at the top level, so the flow is always normal
    for stmt in &program.statements {
        interpreter.stmt(stmt)?;
    }

    Ok(Execution {
        steps: interpreter.budget.used(),
        events: interpreter.effects.into_events(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

struct Interpreter<'a> {
    cart: &'a CartSnapshot,
    max_string_bytes: usize,
    budget: StepBudget,
    scopes: Vec<FxHashMap<String, Value>>,
    effects: EffectAccumulator,
    loop_depth: usize,
}

fn fault(error: RuntimeError, position: Position) -> ScriptError {
    ScriptError::Runtime { error, position }
}

fn mismatch(op: &'static str, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}

impl<'a> Interpreter<'a> {
    // -- statements -----------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        self.budget.charge()?;

        let position = stmt.position;

        match &stmt.kind {
            StmtKind::Let { name, value } => {
                if RESERVED.contains(&name.as_str()) {
                    return Err(fault(RuntimeError::ReadOnlyBinding(name.clone()), position));
                }

                let value = self.eval(value)?;

                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                }
            }
            StmtKind::Assign { name, value } => {
                if RESERVED.contains(&name.as_str()) {
                    return Err(fault(RuntimeError::ReadOnlyBinding(name.clone()), position));
                }

                let value = self.eval(value)?;

                let slot = self
                    .scopes
                    .iter_mut()
                    .rev()
                    .find_map(|scope| scope.get_mut(name))
                    .ok_or_else(|| {
                        fault(RuntimeError::UndefinedVariable(name.clone()), position)
                    })?;

                *slot = value;
            }
            StmtKind::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.condition(condition)? {
                        return self.block(body, None);
                    }
                }

                if let Some(body) = otherwise {
                    return self.block(body, None);
                }
            }
            StmtKind::For {
                binding,
                iterable,
                body,
            } => self.for_loop(binding, iterable, body, position)?,
            StmtKind::While { condition, body } => self.while_loop(condition, body)?,
            StmtKind::Break => return self.control(Flow::Break, "break", position),
            StmtKind::Continue => return self.control(Flow::Continue, "continue", position),
            StmtKind::Raise(value) => {
                let value = self.eval(value)?;

                return Err(fault(RuntimeError::Raised(value.to_string()), position));
            }
            StmtKind::Expr(value) => {
                self.eval(value)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn for_loop(
        &mut self,
        binding: &str,
        iterable: &Expr,
        body: &[Stmt],
        position: Position,
    ) -> Result<(), ScriptError> {
        let items = self.eval(iterable)?;

        if items != Value::LineItems {
            return Err(fault(
                mismatch("for", "line items", &items),
                iterable.position,
            ));
        }

        if RESERVED.contains(&binding) {
            return Err(fault(
                RuntimeError::ReadOnlyBinding(binding.to_string()),
                position,
            ));
        }

        self.loop_depth += 1;

        for index in 0..self.cart.len() {
            self.budget.charge()?;

            if self.block(body, Some((binding, Value::Line(index))))? == Flow::Break {
                break;
            }
        }

        self.loop_depth -= 1;

        Ok(())
    }

    fn while_loop(&mut self, condition: &Expr, body: &[Stmt]) -> Result<(), ScriptError> {
        self.loop_depth += 1;

        while self.condition(condition)? {
            self.budget.charge()?;

            if self.block(body, None)? == Flow::Break {
                break;
            }
        }

        self.loop_depth -= 1;

        Ok(())
    }

    fn control(
        &self,
        flow: Flow,
        keyword: &'static str,
        position: Position,
    ) -> Result<Flow, ScriptError> {
        if self.loop_depth == 0 {
            Err(fault(RuntimeError::StrayControl(keyword), position))
        } else {
            Ok(flow)
        }
    }

    fn block(
        &mut self,
        body: &[Stmt],
        binding: Option<(&str, Value)>,
    ) -> Result<Flow, ScriptError> {
        let mut scope = FxHashMap::default();

        if let Some((name, value)) = binding {
            scope.insert(name.to_string(), value);
        }

        self.scopes.push(scope);

        let mut flow = Flow::Normal;

        for stmt in body {
            flow = self.stmt(stmt)?;

            if flow != Flow::Normal {
                break;
            }
        }

        self.scopes.pop();

        Ok(flow)
    }

    fn condition(&mut self, expr: &Expr) -> Result<bool, ScriptError> {
        match self.eval(expr)? {
            Value::Bool(value) => Ok(value),
            other => Err(fault(mismatch("condition", "bool", &other), expr.position)),
        }
    }

    // -- expressions ----------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        self.budget.charge()?;

        let position = expr.position;

        let value = match &expr.kind {
            ExprKind::Number(number) => Value::Number(*number),
            ExprKind::Str(text) if text.len() > self.max_string_bytes => {
                return Err(fault(
                    RuntimeError::StringTooLong(self.max_string_bytes),
                    position,
                ));
            }
            ExprKind::Str(text) => Value::Str(text.clone()),
            ExprKind::Bool(value) => Value::Bool(*value),
            ExprKind::Nil => Value::Nil,
            ExprKind::Var(name) => self.lookup(name, position)?,
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;

                match (*op, operand) {
                    (UnaryOp::Not, Value::Bool(value)) => Value::Bool(!value),
                    (UnaryOp::Neg, Value::Number(number)) => Value::Number(-number),
                    (UnaryOp::Not, other) => {
                        return Err(fault(mismatch("!", "bool", &other), position));
                    }
                    (UnaryOp::Neg, other) => {
                        return Err(fault(mismatch("-", "number", &other), position));
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;

                self.binary(*op, &lhs, &rhs)
                    .map_err(|error| fault(error, position))?
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let lhs = self.condition(lhs)?;

                let result = match op {
                    LogicalOp::And if !lhs => false,
                    LogicalOp::Or if lhs => true,
                    LogicalOp::And | LogicalOp::Or => self.condition(rhs)?,
                };

                Value::Bool(result)
            }
            ExprKind::Property { target, name } => {
                let target = self.eval(target)?;

                self.property(&target, name)
                    .map_err(|error| fault(error, position))?
            }
            ExprKind::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;

                self.index(&target, &index)
                    .map_err(|error| fault(error, position))?
            }
            ExprKind::Call { name, args } => {
                let args = self.args(args)?;

                call_builtin(name, &args).map_err(|error| fault(error, position))?
            }
            ExprKind::MethodCall { target, name, args } => {
                let target = self.eval(target)?;
                let args = self.args(args)?;

                self.method(&target, name, args)
                    .map_err(|error| fault(error, position))?
            }
        };

        Ok(value)
    }

    fn lookup(&self, name: &str, position: Position) -> Result<Value, ScriptError> {
        if let Some(value) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Ok(value.clone());
        }

        match name {
            "cart" => Ok(Value::Cart),
            "Input" => Ok(Value::Input),
            _ => Err(fault(
                RuntimeError::UndefinedVariable(name.to_string()),
                position,
            )),
        }
    }

    fn args(&mut self, args: &[Arg]) -> Result<Vec<(Option<String>, Value)>, ScriptError> {
        args.iter()
            .map(|arg| Ok((arg.name.clone(), self.eval(&arg.value)?)))
            .collect()
    }

    fn binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
        let symbol = op.symbol();

        match op {
            BinaryOp::Eq => return Ok(Value::Bool(lhs == rhs)),
            BinaryOp::NotEq => return Ok(Value::Bool(lhs != rhs)),
            BinaryOp::Add if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) => {
                let joined = format!("{lhs}{rhs}");

                if joined.len() > self.max_string_bytes {
                    return Err(RuntimeError::StringTooLong(self.max_string_bytes));
                }

                return Ok(Value::Str(joined));
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
                    return Ok(Value::Bool(compare(op, a.as_str().cmp(b.as_str()))));
                }
            }
            _ => {}
        }

        let a = number_operand(symbol, lhs)?;
        let b = number_operand(symbol, rhs)?;

        let result = match op {
            BinaryOp::Add => a.checked_add(b).ok_or(RuntimeError::Overflow)?,
            BinaryOp::Sub => a.checked_sub(b).ok_or(RuntimeError::Overflow)?,
            BinaryOp::Mul => a.checked_mul(b).ok_or(RuntimeError::Overflow)?,
            BinaryOp::Div | BinaryOp::Rem if b.is_zero() => {
                return Err(RuntimeError::DivisionByZero);
            }
            BinaryOp::Div => a.checked_div(b).ok_or(RuntimeError::Overflow)?,
            BinaryOp::Rem => a.checked_rem(b).ok_or(RuntimeError::Overflow)?,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::NotEq => return Ok(Value::Bool(compare(op, a.cmp(&b)))),
        };

        Ok(Value::Number(result))
    }

    fn line(&self, index: usize) -> Result<&'a LineItem, RuntimeError> {
        self.cart
            .line_items()
            .get(index)
            .ok_or(RuntimeError::IndexOutOfBounds {
                index: index.to_string(),
                len: self.cart.len(),
            })
    }

    fn property(&self, target: &Value, name: &str) -> Result<Value, RuntimeError> {
        let value = match (target, name) {
            (Value::Input, "cart") => Value::Cart,
            (Value::Cart, "subtotal_price") => Value::Number(self.cart.subtotal_price()),
            (Value::Cart, "line_items") => Value::LineItems,
            (Value::LineItems, "size" | "length") => Value::Number(Decimal::from(self.cart.len())),
            (Value::LineItems, "empty?" | "is_empty") => Value::Bool(self.cart.is_empty()),
            (Value::LineItems, "first") => {
                if self.cart.is_empty() {
                    Value::Nil
                } else {
                    Value::Line(0)
                }
            }
            (Value::LineItems, "last") => self
                .cart
                .len()
                .checked_sub(1)
                .map_or(Value::Nil, Value::Line),
            (Value::Line(index), "line_price" | "total_price") => {
                Value::Number(self.line(*index)?.total_price())
            }
            (Value::Line(index), "gift_card" | "gift_card?")
            | (Value::Product(index), "gift_card" | "gift_card?") => {
                Value::Bool(!self.line(*index)?.is_product_variant())
            }
            (Value::Line(index), "variant" | "product_variant") => Value::Variant(*index),
            (Value::Variant(index), "id") => self
                .line(*index)?
                .product_variant_id()
                .map_or(Value::Nil, |id| Value::Str(id.to_string())),
            (Value::Variant(index), "product") => Value::Product(*index),
            _ => {
                return Err(RuntimeError::UnknownProperty {
                    ty: target.type_name(),
                    name: name.to_string(),
                });
            }
        };

        Ok(value)
    }

    fn index(&self, target: &Value, index: &Value) -> Result<Value, RuntimeError> {
        if *target != Value::LineItems {
            return Err(mismatch("[]", "line items", target));
        }

        let Value::Number(number) = index else {
            return Err(mismatch("[]", "number", index));
        };

        let position = number
            .fract()
            .is_zero()
            .then(|| number.to_usize())
            .flatten()
            .filter(|&position| position < self.cart.len())
            .ok_or(RuntimeError::IndexOutOfBounds {
                index: number.normalize().to_string(),
                len: self.cart.len(),
            })?;

        Ok(Value::Line(position))
    }

    fn method(
        &mut self,
        target: &Value,
        name: &str,
        args: Vec<(Option<String>, Value)>,
    ) -> Result<Value, RuntimeError> {
        match (target, name) {
            (Value::Line(index), "change_line_price" | "propose_new_price") => {
                let (price, options) = proposal_args(name, args, self.max_string_bytes)?;
                let line = self.line(*index)?;

                self.effects.propose_new_price(line, price, options)?;

                Ok(Value::Nil)
            }
            // zero-argument calls read properties: `line_items.size()`
            _ if args.is_empty() => match self.property(target, name) {
                Err(RuntimeError::UnknownProperty { ty, name }) => {
                    Err(RuntimeError::UnknownMethod { ty, name })
                }
                other => other,
            },
            _ => Err(RuntimeError::UnknownMethod {
                ty: target.type_name(),
                name: name.to_string(),
            }),
        }
    }
}

fn compare(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::NotEq => ordering.is_ne(),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => false,
    }
}

fn number_operand(op: &'static str, value: &Value) -> Result<Decimal, RuntimeError> {
    match value {
        Value::Number(number) => Ok(*number),
        other => Err(mismatch(op, "number", other)),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidArguments {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// `(new_price, message: "...")`
fn proposal_args(
    name: &str,
    args: Vec<(Option<String>, Value)>,
    max_string_bytes: usize,
) -> Result<(Decimal, ProposalOptions), RuntimeError> {
    let mut price = None;
    let mut options = ProposalOptions::default();

    for (label, value) in args {
        match (label.as_deref(), value) {
            (None | Some("price"), Value::Number(number)) if price.is_none() => {
                price = Some(number);
            }
            (Some("message"), Value::Str(text)) => {
                if text.len() > max_string_bytes {
                    return Err(RuntimeError::StringTooLong(max_string_bytes));
                }

                options.message = Some(text);
            }
            (Some("message"), Value::Nil) => options.message = None,
            (label, value) => {
                return Err(invalid(
                    name,
                    format!(
                        "unexpected {} argument{}",
                        value.type_name(),
                        label.map(|l| format!(" `{l}`")).unwrap_or_default()
                    ),
                ));
            }
        }
    }

    let price = price.ok_or_else(|| invalid(name, "missing new price"))?;

    Ok((price, options))
}

fn call_builtin(name: &str, args: &[(Option<String>, Value)]) -> Result<Value, RuntimeError> {
    let numbers = || -> Result<Vec<Decimal>, RuntimeError> {
        args.iter()
            .map(|(_, value)| number_operand("argument", value))
            .collect()
    };

    let result = match name {
        "Money" => match args {
            [(label, Value::Number(cents))]
                if matches!(label.as_deref(), None | Some("cents")) =>
            {
                cents
                    .checked_div(Decimal::ONE_HUNDRED)
                    .ok_or(RuntimeError::Overflow)?
            }
            _ => return Err(invalid(name, "expected `cents: number`")),
        },
        "min" | "max" => {
            let numbers = numbers()?;
            let picked = if name == "min" {
                numbers.into_iter().min()
            } else {
                numbers.into_iter().max()
            };

            picked.ok_or_else(|| invalid(name, "expected at least one number"))?
        }
        "abs" => match numbers()?.as_slice() {
            [number] => number.abs(),
            _ => return Err(invalid(name, "expected one number")),
        },
        "round" => match numbers()?.as_slice() {
            [number] => number.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            [number, places] => {
                let dp = places
                    .fract()
                    .is_zero()
                    .then(|| places.to_u32())
                    .flatten()
                    .filter(|&dp| dp <= MAX_ROUND_DP)
                    .ok_or_else(|| invalid(name, "decimal places must be 0 to 28"))?;

                number.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
            }
            _ => return Err(invalid(name, "expected a number and optional places")),
        },
        _ => return Err(RuntimeError::UnknownFunction(name.to_string())),
    };

    Ok(Value::Number(result))
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;
    use serde_json::json;
    use testresult::TestResult;

    use super::*;
    use crate::{effects::EffectError, input::RawCart, script::parser::parse};

    fn cart() -> CartSnapshot {
        let raw: RawCart = serde_json::from_value(json!({
            "subtotal_price": "100.00",
            "lines": [
                { "merchandise": { "typename": "ProductVariant", "id": "gid://A" },
                  "cost": { "totalAmount": "50.00" } },
                { "merchandise": { "typename": "ProductVariant", "id": "gid://B" },
                  "cost": { "totalAmount": "30.00" } },
                { "merchandise": { "typename": "GiftCard" },
                  "cost": { "totalAmount": "20.00" } }
            ]
        }))
        .expect("raw cart should deserialize");

        CartSnapshot::from_raw(&raw).expect("cart should build")
    }

    fn run_with(source: &str, limits: &ExecutionLimits) -> Result<Execution, ScriptError> {
        let cart = cart();
        let program = parse(source, limits.max_nesting_depth)?;

        execute(&program, &cart, limits)
    }

    fn run(source: &str) -> Result<Execution, ScriptError> {
        run_with(source, &ExecutionLimits::default())
    }

    fn runtime_error(source: &str) -> Option<RuntimeError> {
        match run(source) {
            Err(ScriptError::Runtime { error, .. }) => Some(error),
            _ => None,
        }
    }

    #[test]
    fn proposes_for_each_eligible_line() -> TestResult {
        let execution = run(r#"
            for line in cart.line_items {
                if !line.gift_card {
                    line.change_line_price(line.line_price * 0.9, message: "Volume discount");
                }
            }
        "#)?;

        let summary: Vec<_> = execution
            .events
            .iter()
            .map(|event| (event.product_variant_id.as_deref(), event.percentage))
            .collect();

        assert_eq!(
            summary,
            vec![(Some("gid://A"), dec!(0.9)), (Some("gid://B"), dec!(0.9))]
        );
        assert!(execution.steps > 0);

        Ok(())
    }

    #[test]
    fn gift_card_lines_still_record_ineligible_events() -> TestResult {
        let execution = run("let gc = cart.line_items.last; gc.propose_new_price(10);")?;

        let event = execution.events.first().ok_or("missing event")?;

        assert!(!event.eligible);
        assert_eq!(event.percentage, dec!(0.5));
        assert_eq!(event.message, None);

        Ok(())
    }

    #[test]
    fn variables_scopes_and_assignment() -> TestResult {
        let execution = run(r#"
            let total = 0;
            let i = 0;
            while i < cart.line_items.size {
                let line = cart.line_items[i];
                total = total + line.line_price;
                i = i + 1;
            }
            if total != cart.subtotal_price { raise "mismatch " + total; }
        "#)?;

        assert!(execution.events.is_empty());

        Ok(())
    }

    #[test]
    fn block_locals_do_not_escape() {
        assert_eq!(
            runtime_error("if true { let hidden = 1; } hidden;"),
            Some(RuntimeError::UndefinedVariable("hidden".to_string()))
        );
    }

    #[test]
    fn break_and_continue() -> TestResult {
        let execution = run(r#"
            for line in Input.cart.line_items {
                if line.variant.product.gift_card? { continue; }
                line.change_line_price(Money(cents: 1000));
                break;
            }
        "#)?;

        assert_eq!(execution.events.len(), 1);
        assert_eq!(
            execution.events.first().map(|e| e.new_price),
            Some(dec!(10))
        );

        Ok(())
    }

    #[test]
    fn builtins() -> TestResult {
        run(r#"
            if min(3, 1, 2) != 1 { raise "min"; }
            if max(3, 1, 2) != 3 { raise "max"; }
            if abs(-4.5) != 4.5 { raise "abs"; }
            if round(2.5) != 3 { raise "round"; }
            if round(1.005, 2) != 1.01 { raise "round dp"; }
            if Money(cents: 250) != 2.5 { raise "money"; }
            if cart.line_items.first.product_variant.id != "gid://A" { raise "id"; }
            if cart.line_items.last.variant.id != nil { raise "gift card id"; }
        "#)?;

        Ok(())
    }

    #[test]
    fn raise_carries_message() {
        assert_eq!(
            runtime_error(r#"raise "stop " + 1.50;"#),
            Some(RuntimeError::Raised("stop 1.5".to_string()))
        );
    }

    #[test]
    fn read_only_bindings() {
        assert_eq!(
            runtime_error("cart = 1;"),
            Some(RuntimeError::ReadOnlyBinding("cart".to_string()))
        );
        assert_eq!(
            runtime_error("let Input = 1;"),
            Some(RuntimeError::ReadOnlyBinding("Input".to_string()))
        );
    }

    #[test]
    fn undeclared_assignment_faults() {
        assert_eq!(
            runtime_error("total = 1;"),
            Some(RuntimeError::UndefinedVariable("total".to_string()))
        );
    }

    #[test]
    fn arithmetic_faults() {
        assert_eq!(runtime_error("1 / 0;"), Some(RuntimeError::DivisionByZero));
        assert_eq!(runtime_error("5 % 0;"), Some(RuntimeError::DivisionByZero));
        assert_eq!(
            runtime_error("79228162514264337593543950335 * 2;"),
            Some(RuntimeError::Overflow)
        );
    }

    #[test]
    fn conditions_must_be_bool() {
        assert_eq!(
            runtime_error("if 1 { }"),
            Some(RuntimeError::TypeMismatch {
                op: "condition",
                expected: "bool",
                found: "number",
            })
        );
    }

    #[test]
    fn equality_across_types_is_false() -> TestResult {
        run(r#"if 1 == "1" { raise "equal"; } if nil != nil { raise "nil"; }"#)?;

        Ok(())
    }

    #[test]
    fn unknown_members_fault() {
        assert_eq!(
            runtime_error("cart.customer;"),
            Some(RuntimeError::UnknownProperty {
                ty: "cart",
                name: "customer".to_string(),
            })
        );
        assert_eq!(
            runtime_error("cart.line_items.first.delete(1);"),
            Some(RuntimeError::UnknownMethod {
                ty: "line item",
                name: "delete".to_string(),
            })
        );
        assert_eq!(
            runtime_error("system(1);"),
            Some(RuntimeError::UnknownFunction("system".to_string()))
        );
    }

    #[test]
    fn index_out_of_bounds() {
        assert_eq!(
            runtime_error("cart.line_items[3];"),
            Some(RuntimeError::IndexOutOfBounds {
                index: "3".to_string(),
                len: 3,
            })
        );
        assert!(matches!(
            runtime_error("cart.line_items[0.5];"),
            Some(RuntimeError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn stray_break_faults() {
        assert_eq!(
            runtime_error("break;"),
            Some(RuntimeError::StrayControl("break"))
        );
    }

    #[test]
    fn proposal_faults_surface_as_effect_errors() {
        assert!(matches!(
            runtime_error("cart.line_items.first.change_line_price(-1);"),
            Some(RuntimeError::Effect(EffectError::NegativePrice { .. }))
        ));
        assert!(matches!(
            runtime_error("cart.line_items.first.change_line_price(message: \"x\");"),
            Some(RuntimeError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn unbounded_loop_exhausts_steps() {
        let limits = ExecutionLimits {
            max_steps: 1_000,
            timeout: None,
            ..ExecutionLimits::default()
        };

        assert_eq!(
            run_with("while true { }", &limits).err(),
            Some(ScriptError::StepLimitExceeded { limit: 1_000 })
        );
    }

    #[test]
    fn string_growth_is_bounded() {
        let limits = ExecutionLimits {
            max_string_bytes: 16,
            ..ExecutionLimits::default()
        };

        let result = run_with(
            r#"let s = "x"; while true { s = s + s; }"#,
            &limits,
        );

        assert!(matches!(
            result,
            Err(ScriptError::Runtime {
                error: RuntimeError::StringTooLong(16),
                ..
            })
        ));
    }

    #[test]
    fn oversized_literals_are_rejected() {
        let limits = ExecutionLimits {
            max_string_bytes: 8,
            ..ExecutionLimits::default()
        };

        let result = run_with(r#"raise "far too long for the limit";"#, &limits);

        assert!(matches!(
            result,
            Err(ScriptError::Runtime {
                error: RuntimeError::StringTooLong(8),
                ..
            })
        ));
    }

    #[test]
    fn money_accepts_positional_cents() -> TestResult {
        run(r#"if Money(150) != 1.5 { raise "positional"; }"#)?;

        assert_eq!(
            runtime_error("Money(dollars: 1);"),
            Some(invalid("Money", "expected `cents: number`"))
        );

        Ok(())
    }

    #[test]
    fn proposal_limit_is_enforced() {
        let limits = ExecutionLimits {
            max_proposals: 2,
            ..ExecutionLimits::default()
        };

        let result = run_with(
            "for line in cart.line_items { line.change_line_price(1); }",
            &limits,
        );

        assert!(matches!(
            result,
            Err(ScriptError::Runtime {
                error: RuntimeError::Effect(EffectError::TooManyProposals(2)),
                ..
            })
        ));
    }
}
