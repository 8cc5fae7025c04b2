//! Aggregation pipelines.
//!
//! A pipeline is parsed up front into [`Stage`]s and run in memory over the
//! collection's documents. Expressions cover field paths, literals, `$$ROOT`,
//! arithmetic, string helpers, comparisons and `$cond`/`$ifNull`.

use bson::{Bson, Document};
use std::{cmp::Ordering, collections::HashMap};

use crate::server::{
    error::store::StoreError,
    store::{
        filter::Filter,
        projection::Projection,
        sort::SortSpec,
        value::{canonical_key, compare, equals, get_path, is_truthy, remove_path, set_path, Number},
    },
};

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidPipeline(msg.into())
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

#[derive(Debug, Clone)]
enum Stage {
    Match(Filter),
    Project(ProjectStage),
    AddFields(Vec<(String, Expr)>),
    Unset(Vec<String>),
    Sort(SortSpec),
    Skip(usize),
    Limit(usize),
    Count(String),
    Unwind { path: String, preserve_empty: bool },
    Group(GroupStage),
}

#[derive(Debug, Clone)]
enum ProjectStage {
    Exclude(Projection),
    Include {
        include_id: bool,
        fields: Vec<(String, Option<Expr>)>,
    },
}

#[derive(Debug, Clone)]
struct GroupStage {
    id: Expr,
    fields: Vec<(String, Accumulator, Expr)>,
}

#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    Push,
    AddToSet,
}

impl Pipeline {
    pub fn parse(stages: &[Document]) -> Result<Self, StoreError> {
        let stages = stages.iter().map(parse_stage).collect::<Result<_, _>>()?;
        Ok(Self { stages })
    }

    /// The filter of a leading `$match` stage, usable to narrow the scan.
    pub fn leading_match(&self) -> Option<&Filter> {
        match self.stages.first() {
            Some(Stage::Match(filter)) => Some(filter),
            _ => None,
        }
    }

    pub fn run(&self, mut docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        for stage in &self.stages {
            docs = run_stage(stage, docs)?;
        }
        Ok(docs)
    }
}

fn parse_stage(stage: &Document) -> Result<Stage, StoreError> {
    let mut entries = stage.iter();
    let (Some((name, spec)), None) = (entries.next(), entries.next()) else {
        return Err(invalid("a pipeline stage must have exactly one field"));
    };

    let as_doc = |spec: &Bson| match spec {
        Bson::Document(doc) => Ok(doc.clone()),
        _ => Err(invalid(format!("{name} needs an object"))),
    };
    let as_count = |spec: &Bson| match Number::of(spec) {
        Some(Number::Int(n)) if n >= 0 => Ok(n as usize),
        _ => Err(invalid(format!("{name} needs a non-negative integer"))),
    };

    Ok(match name.as_str() {
        "$match" => Stage::Match(Filter::parse(&as_doc(spec)?)?),
        "$project" => Stage::Project(parse_project(&as_doc(spec)?)?),
        "$addFields" | "$set" => Stage::AddFields(
            as_doc(spec)?
                .iter()
                .map(|(k, v)| Ok((k.clone(), Expr::parse(v)?)))
                .collect::<Result<_, StoreError>>()?,
        ),
        "$unset" => Stage::Unset(match spec {
            Bson::String(path) => vec![path.clone()],
            Bson::Array(items) => items
                .iter()
                .map(|item| match item {
                    Bson::String(path) => Ok(path.clone()),
                    _ => Err(invalid("$unset takes field names")),
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(invalid("$unset takes a field name or a list of them")),
        }),
        "$sort" => Stage::Sort(
            SortSpec::parse(&as_doc(spec)?).map_err(|e| invalid(e.to_string()))?,
        ),
        "$skip" => Stage::Skip(as_count(spec)?),
        "$limit" => Stage::Limit(as_count(spec)?),
        "$count" => match spec {
            Bson::String(field) if !field.is_empty() && !field.starts_with('$') => {
                Stage::Count(field.clone())
            }
            _ => return Err(invalid("$count needs a non-empty field name")),
        },
        "$unwind" => parse_unwind(spec)?,
        "$group" => Stage::Group(parse_group(&as_doc(spec)?)?),
        other => return Err(invalid(format!("unrecognized pipeline stage name: '{other}'"))),
    })
}

fn parse_project(spec: &Document) -> Result<ProjectStage, StoreError> {
    let is_flag = |v: &Bson| matches!(v, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_));
    let excluding = spec
        .iter()
        .filter(|(k, _)| k.as_str() != "_id")
        .all(|(_, v)| is_flag(v) && !is_truthy(v));
    if excluding {
        return Ok(ProjectStage::Exclude(Projection::parse(spec)?));
    }

    let mut include_id = true;
    let mut fields = Vec::new();
    for (path, value) in spec {
        match value {
            flag if is_flag(flag) && path == "_id" => include_id = is_truthy(flag),
            flag if is_flag(flag) && is_truthy(flag) => fields.push((path.clone(), None)),
            flag if is_flag(flag) => {
                return Err(invalid(format!("cannot exclude '{path}' in an inclusion projection")))
            }
            expr => fields.push((path.clone(), Some(Expr::parse(expr)?))),
        }
    }
    Ok(ProjectStage::Include { include_id, fields })
}

fn parse_unwind(spec: &Bson) -> Result<Stage, StoreError> {
    let (path, preserve_empty) = match spec {
        Bson::String(path) => (path.clone(), false),
        Bson::Document(doc) => match doc.get("path") {
            Some(Bson::String(path)) => (
                path.clone(),
                matches!(doc.get("preserveNullAndEmptyArrays"), Some(Bson::Boolean(true))),
            ),
            _ => return Err(invalid("$unwind needs a path")),
        },
        _ => return Err(invalid("$unwind needs a path")),
    };
    match path.strip_prefix('$') {
        Some(field) if !field.is_empty() => Ok(Stage::Unwind {
            path: field.to_string(),
            preserve_empty,
        }),
        _ => Err(invalid("$unwind path must start with '$'")),
    }
}

fn parse_group(spec: &Document) -> Result<GroupStage, StoreError> {
    let id = spec
        .get("_id")
        .ok_or_else(|| invalid("a group specification must include an _id"))?;
    let id = Expr::parse(id)?;

    let mut fields = Vec::new();
    for (name, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        let Bson::Document(acc) = acc else {
            return Err(invalid(format!("the field '{name}' must be an accumulator object")));
        };
        let mut entries = acc.iter();
        let (Some((op, arg)), None) = (entries.next(), entries.next()) else {
            return Err(invalid(format!("the field '{name}' must specify one accumulator")));
        };
        let accumulator = match op.as_str() {
            "$sum" => Accumulator::Sum,
            "$avg" => Accumulator::Avg,
            "$min" => Accumulator::Min,
            "$max" => Accumulator::Max,
            "$first" => Accumulator::First,
            "$last" => Accumulator::Last,
            "$push" => Accumulator::Push,
            "$addToSet" => Accumulator::AddToSet,
            other => return Err(invalid(format!("unknown group operator '{other}'"))),
        };
        fields.push((name.clone(), accumulator, Expr::parse(arg)?));
    }
    Ok(GroupStage { id, fields })
}

fn run_stage(stage: &Stage, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
    Ok(match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Project(ProjectStage::Exclude(projection)) => {
            docs.into_iter().map(|d| projection.apply(d)).collect()
        }
        Stage::Project(ProjectStage::Include { include_id, fields }) => {
            let mut out = Vec::with_capacity(docs.len());
            for doc in docs {
                let mut projected = Document::new();
                if *include_id {
                    if let Some(id) = doc.get("_id") {
                        projected.insert("_id", id.clone());
                    }
                }
                for (path, expr) in fields {
                    let value = match expr {
                        None => get_path(&doc, path).cloned(),
                        Some(expr) => expr.eval(&doc)?,
                    };
                    if let Some(value) = value {
                        set_path(&mut projected, path, value).map_err(|e| invalid(e.to_string()))?;
                    }
                }
                out.push(projected);
            }
            out
        }
        Stage::AddFields(fields) => {
            let mut out = Vec::with_capacity(docs.len());
            for mut doc in docs {
                for (path, expr) in fields {
                    let value = expr.eval(&doc)?.unwrap_or(Bson::Null);
                    set_path(&mut doc, path, value).map_err(|e| invalid(e.to_string()))?;
                }
                out.push(doc);
            }
            out
        }
        Stage::Unset(paths) => docs
            .into_iter()
            .map(|mut doc| {
                for path in paths {
                    remove_path(&mut doc, path);
                }
                doc
            })
            .collect(),
        Stage::Sort(spec) => {
            let mut docs = docs;
            spec.sort(&mut docs);
            docs
        }
        Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
        Stage::Limit(n) => docs.into_iter().take(*n).collect(),
        Stage::Count(_) if docs.is_empty() => Vec::new(),
        Stage::Count(field) => {
            let mut counted = Document::new();
            counted.insert(field.clone(), Number::Int(docs.len() as i64).into_bson(true));
            vec![counted]
        }
        Stage::Unwind {
            path,
            preserve_empty,
        } => unwind(docs, path, *preserve_empty)?,
        Stage::Group(group) => run_group(group, docs)?,
    })
}

fn unwind(
    docs: Vec<Document>,
    path: &str,
    preserve_empty: bool,
) -> Result<Vec<Document>, StoreError> {
    let mut out = Vec::new();
    for doc in docs {
        match get_path(&doc, path) {
            Some(Bson::Array(items)) if !items.is_empty() => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item).map_err(|e| invalid(e.to_string()))?;
                    out.push(copy);
                }
            }
            Some(Bson::Array(_)) | Some(Bson::Null) | None => {
                if preserve_empty {
                    out.push(doc);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

#[derive(Debug)]
enum AccState {
    Sum(Number),
    Avg(f64, u64),
    Extreme(Option<Bson>),
    First(Option<Bson>),
    Last(Bson),
    Values(Vec<Bson>),
}

impl AccState {
    fn new(acc: Accumulator) -> Self {
        match acc {
            Accumulator::Sum => Self::Sum(Number::Int(0)),
            Accumulator::Avg => Self::Avg(0.0, 0),
            Accumulator::Min | Accumulator::Max => Self::Extreme(None),
            Accumulator::First => Self::First(None),
            Accumulator::Last => Self::Last(Bson::Null),
            Accumulator::Push | Accumulator::AddToSet => Self::Values(Vec::new()),
        }
    }

    fn feed(&mut self, acc: Accumulator, value: Option<Bson>) {
        match self {
            Self::Sum(total) => {
                if let Some(n) = value.as_ref().and_then(Number::of) {
                    *total = total.add(n);
                }
            }
            Self::Avg(sum, count) => {
                if let Some(n) = value.as_ref().and_then(Number::of) {
                    *sum += n.as_f64();
                    *count += 1;
                }
            }
            Self::Extreme(current) => {
                let Some(value) = value.filter(|v| !matches!(v, Bson::Null)) else {
                    return;
                };
                let wanted = if matches!(acc, Accumulator::Min) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                match current {
                    Some(existing) if compare(&value, existing) != wanted => {}
                    _ => *current = Some(value),
                }
            }
            Self::First(first) => {
                if first.is_none() {
                    *first = Some(value.unwrap_or(Bson::Null));
                }
            }
            Self::Last(last) => *last = value.unwrap_or(Bson::Null),
            Self::Values(values) => {
                let Some(value) = value else { return };
                if matches!(acc, Accumulator::AddToSet) && values.iter().any(|v| equals(v, &value)) {
                    return;
                }
                values.push(value);
            }
        }
    }

    fn finish(self) -> Bson {
        match self {
            Self::Sum(total) => total.into_bson(true),
            Self::Avg(_, 0) => Bson::Null,
            Self::Avg(sum, count) => Bson::Double(sum / count as f64),
            Self::Extreme(value) | Self::First(value) => value.unwrap_or(Bson::Null),
            Self::Last(value) => value,
            Self::Values(values) => Bson::Array(values),
        }
    }
}

fn run_group(group: &GroupStage, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
    let mut order: Vec<(Bson, Vec<AccState>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in &docs {
        let id = group.id.eval(doc)?.unwrap_or(Bson::Null);
        let slot = *index.entry(canonical_key(&id)).or_insert_with(|| {
            order.push((
                id.clone(),
                group.fields.iter().map(|(_, acc, _)| AccState::new(*acc)).collect(),
            ));
            order.len() - 1
        });
        for ((_, acc, expr), state) in group.fields.iter().zip(order[slot].1.iter_mut()) {
            state.feed(*acc, expr.eval(doc)?);
        }
    }

    Ok(order
        .into_iter()
        .map(|(id, states)| {
            let mut out = Document::new();
            out.insert("_id", id);
            for ((name, _, _), state) in group.fields.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect())
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Bson),
    Field(String),
    Root,
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Op(Op, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
    ToUpper,
    ToLower,
    IfNull,
    Cond,
    Cmp(Ordering, bool),
    Ne,
    And,
    Or,
    Not,
}

impl Expr {
    fn parse(value: &Bson) -> Result<Self, StoreError> {
        match value {
            Bson::String(s) if s == "$$ROOT" => Ok(Self::Root),
            Bson::String(s) if s.starts_with("$$") => {
                Err(invalid(format!("unsupported variable: {s}")))
            }
            Bson::String(s) if s.starts_with('$') => Ok(Self::Field(s[1..].to_string())),
            Bson::Array(items) => Ok(Self::Array(
                items.iter().map(Self::parse).collect::<Result<_, _>>()?,
            )),
            Bson::Document(doc) => Self::parse_document(doc),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    fn parse_document(doc: &Document) -> Result<Self, StoreError> {
        let first = doc.keys().next();
        let Some(name) = first.filter(|k| k.starts_with('$')) else {
            return Ok(Self::Object(
                doc.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::parse(v)?)))
                    .collect::<Result<_, StoreError>>()?,
            ));
        };
        if doc.len() != 1 {
            return Err(invalid(format!("an expression object with {name} must have one field")));
        }
        let arg = doc.get(name).unwrap_or(&Bson::Null);

        if name == "$literal" {
            return Ok(Self::Literal(arg.clone()));
        }
        let op = match name.as_str() {
            "$add" => Op::Add,
            "$subtract" => Op::Subtract,
            "$multiply" => Op::Multiply,
            "$divide" => Op::Divide,
            "$concat" => Op::Concat,
            "$toUpper" => Op::ToUpper,
            "$toLower" => Op::ToLower,
            "$ifNull" => Op::IfNull,
            "$cond" => Op::Cond,
            "$eq" => Op::Cmp(Ordering::Equal, true),
            "$ne" => Op::Ne,
            "$gt" => Op::Cmp(Ordering::Greater, false),
            "$gte" => Op::Cmp(Ordering::Greater, true),
            "$lt" => Op::Cmp(Ordering::Less, false),
            "$lte" => Op::Cmp(Ordering::Less, true),
            "$and" => Op::And,
            "$or" => Op::Or,
            "$not" => Op::Not,
            other => return Err(invalid(format!("unrecognized expression '{other}'"))),
        };

        let args = match (op, arg) {
            (Op::Cond, Bson::Document(parts)) => ["if", "then", "else"]
                .iter()
                .map(|key| {
                    parts
                        .get(*key)
                        .ok_or_else(|| invalid(format!("missing '{key}' parameter to $cond")))
                        .and_then(Self::parse)
                })
                .collect::<Result<Vec<_>, _>>()?,
            (_, Bson::Array(items)) => items.iter().map(Self::parse).collect::<Result<_, _>>()?,
            (_, single) => vec![Self::parse(single)?],
        };

        let arity_ok = match op {
            Op::Subtract | Op::Divide | Op::Cmp(..) | Op::Ne => args.len() == 2,
            Op::Cond => args.len() == 3,
            Op::ToUpper | Op::ToLower | Op::Not => args.len() == 1,
            Op::IfNull => args.len() >= 2,
            _ => true,
        };
        if !arity_ok {
            return Err(invalid(format!("wrong number of arguments to {name}")));
        }
        Ok(Self::Op(op, args))
    }

    /// Evaluates against `doc`. `None` means the value is missing, which
    /// `$project` and `$group` treat differently from an explicit null.
    fn eval(&self, doc: &Document) -> Result<Option<Bson>, StoreError> {
        Ok(match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Field(path) => get_path(doc, path).cloned(),
            Self::Root => Some(Bson::Document(doc.clone())),
            Self::Object(fields) => {
                let mut out = Document::new();
                for (key, expr) in fields {
                    if let Some(value) = expr.eval(doc)? {
                        out.insert(key.clone(), value);
                    }
                }
                Some(Bson::Document(out))
            }
            Self::Array(items) => Some(Bson::Array(
                items
                    .iter()
                    .map(|e| Ok(e.eval(doc)?.unwrap_or(Bson::Null)))
                    .collect::<Result<_, StoreError>>()?,
            )),
            Self::Op(op, args) => Some(eval_op(*op, args, doc)?),
        })
    }
}

fn eval_op(op: Op, args: &[Expr], doc: &Document) -> Result<Bson, StoreError> {
    let value = |i: usize| -> Result<Bson, StoreError> {
        Ok(args[i].eval(doc)?.unwrap_or(Bson::Null))
    };
    let values = || -> Result<Vec<Bson>, StoreError> { (0..args.len()).map(value).collect() };

    Ok(match op {
        Op::Add | Op::Multiply => {
            let mut acc = Number::Int(if op == Op::Add { 0 } else { 1 });
            let mut narrow = true;
            for v in values()? {
                if matches!(v, Bson::Null) {
                    return Ok(Bson::Null);
                }
                let n = Number::of(&v)
                    .ok_or_else(|| invalid(format!("arithmetic on a non-numeric value: {v}")))?;
                narrow &= matches!(v, Bson::Int32(_));
                acc = if op == Op::Add { acc.add(n) } else { acc.mul(n) };
            }
            acc.into_bson(narrow)
        }
        Op::Subtract | Op::Divide => {
            let (a, b) = (value(0)?, value(1)?);
            if matches!(a, Bson::Null) || matches!(b, Bson::Null) {
                return Ok(Bson::Null);
            }
            let (Some(x), Some(y)) = (Number::of(&a), Number::of(&b)) else {
                return Err(invalid("arithmetic on a non-numeric value"));
            };
            if op == Op::Divide {
                if y.as_f64() == 0.0 {
                    return Err(invalid("can't $divide by zero"));
                }
                Bson::Double(x.as_f64() / y.as_f64())
            } else {
                let narrow = matches!(a, Bson::Int32(_)) && matches!(b, Bson::Int32(_));
                let negated = match y {
                    Number::Int(v) => Number::Int(-v),
                    Number::Float(v) => Number::Float(-v),
                };
                x.add(negated).into_bson(narrow)
            }
        }
        Op::Concat => {
            let mut out = String::new();
            for v in values()? {
                match v {
                    Bson::Null => return Ok(Bson::Null),
                    Bson::String(s) => out.push_str(&s),
                    other => return Err(invalid(format!("$concat only supports strings, not {other}"))),
                }
            }
            Bson::String(out)
        }
        Op::ToUpper | Op::ToLower => {
            let text = match value(0)? {
                Bson::Null => String::new(),
                Bson::String(s) => s,
                other => other.to_string(),
            };
            Bson::String(if op == Op::ToUpper {
                text.to_uppercase()
            } else {
                text.to_lowercase()
            })
        }
        Op::IfNull => {
            let last = args.len() - 1;
            for i in 0..last {
                let v = value(i)?;
                if !matches!(v, Bson::Null) {
                    return Ok(v);
                }
            }
            value(last)?
        }
        Op::Cond => {
            if is_truthy(&value(0)?) {
                value(1)?
            } else {
                value(2)?
            }
        }
        Op::Cmp(ordering, inclusive) => {
            let found = compare(&value(0)?, &value(1)?);
            Bson::Boolean(found == ordering || (inclusive && found == Ordering::Equal))
        }
        Op::Ne => Bson::Boolean(!equals(&value(0)?, &value(1)?)),
        Op::And => Bson::Boolean(values()?.iter().all(is_truthy)),
        Op::Or => Bson::Boolean(values()?.iter().any(is_truthy)),
        Op::Not => Bson::Boolean(!is_truthy(&value(0)?)),
    })
}
