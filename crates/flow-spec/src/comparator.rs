//! Value-comparison operators shared by the conditional evaluator and the
//! step-flow controller.
//!
//! Every function here is total: unknown operator codes, unparseable numbers,
//! and missing `end` operands all evaluate to `false` rather than failing.

/// Operator codes carried by the conditional-tag wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Is,
    IsNot,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Between,
    BetweenInclusive,
    NotBetween,
    NotBetweenInclusive,
}

impl Operator {
    /// Resolves a wire code; unknown codes yield `None` and evaluate to
    /// `false` at the call site.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "is" => Some(Operator::Is),
            "isn" => Some(Operator::IsNot),
            "gt" => Some(Operator::GreaterThan),
            "gte" => Some(Operator::GreaterThanOrEqual),
            "lt" => Some(Operator::LessThan),
            "lte" => Some(Operator::LessThanOrEqual),
            "c" => Some(Operator::Contains),
            "cn" => Some(Operator::NotContains),
            "sw" => Some(Operator::StartsWith),
            "ew" => Some(Operator::EndsWith),
            "b" => Some(Operator::Between),
            "bs" => Some(Operator::BetweenInclusive),
            "bn" => Some(Operator::NotBetween),
            "bns" => Some(Operator::NotBetweenInclusive),
            _ => None,
        }
    }

    /// True for the between family, which needs the extra `end` operand.
    pub fn needs_end(&self) -> bool {
        matches!(
            self,
            Operator::Between
                | Operator::BetweenInclusive
                | Operator::NotBetween
                | Operator::NotBetweenInclusive
        )
    }
}

/// Left-hand operand of a comparison: a scalar, or the collection stored for
/// select-like fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparand {
    One(String),
    Many(Vec<String>),
}

/// Compares `left` against `right` (and `end` for the between family).
///
/// Collections support membership via `c`/`cn`; every other operator works on
/// the comma-joined string coercion of the collection.
pub fn compare(op: Operator, left: &Comparand, right: &str, end: Option<&str>) -> bool {
    match left {
        Comparand::Many(values) => match op {
            Operator::Contains => values.iter().any(|value| value == right),
            Operator::NotContains => !values.iter().any(|value| value == right),
            _ => compare_scalar(op, &values.join(","), right, end),
        },
        Comparand::One(value) => compare_scalar(op, value, right, end),
    }
}

/// Resolves a raw operator code and compares; an unknown code or a between
/// operator missing its `end` operand is `false`.
pub fn evaluate(code: &str, left: &Comparand, right: &str, end: Option<&str>) -> bool {
    let Some(op) = Operator::from_code(code) else {
        return false;
    };
    if op.needs_end() && end.is_none() {
        return false;
    }
    compare(op, left, right, end)
}

fn compare_scalar(op: Operator, left: &str, right: &str, end: Option<&str>) -> bool {
    match op {
        Operator::Is => left == right,
        Operator::IsNot => left != right,
        Operator::Contains => left.contains(right),
        Operator::NotContains => !left.contains(right),
        Operator::StartsWith => left.starts_with(right),
        Operator::EndsWith => left.ends_with(right),
        Operator::GreaterThan => numeric(left, right, |l, r| l > r),
        Operator::GreaterThanOrEqual => numeric(left, right, |l, r| l >= r),
        Operator::LessThan => numeric(left, right, |l, r| l < r),
        Operator::LessThanOrEqual => numeric(left, right, |l, r| l <= r),
        Operator::Between => between(left, right, end, |x, start, stop| x > start && x < stop),
        Operator::BetweenInclusive => {
            between(left, right, end, |x, start, stop| x >= start && x <= stop)
        }
        Operator::NotBetween => between(left, right, end, |x, start, stop| x < start || x > stop),
        Operator::NotBetweenInclusive => {
            between(left, right, end, |x, start, stop| x <= start || x >= stop)
        }
    }
}

fn numeric(left: &str, right: &str, check: impl Fn(f64, f64) -> bool) -> bool {
    match (parse_number(left), parse_number(right)) {
        (Some(l), Some(r)) => check(l, r),
        _ => false,
    }
}

fn between(left: &str, start: &str, end: Option<&str>, check: impl Fn(f64, f64, f64) -> bool) -> bool {
    let (Some(x), Some(lo)) = (parse_number(left), parse_number(start)) else {
        return false;
    };
    let Some(hi) = end.and_then(parse_number) else {
        return false;
    };
    check(x, lo, hi)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}
