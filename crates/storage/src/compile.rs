//! Query compiler
//!
//! Turns a client-level [`QuerySpec`] into a [`StoreFilter`] plus sort and
//! limit. The compiler is pure: it touches no store and applies no policy.
//!
//! # Rules
//!
//! - `ids` becomes an identity-in filter.
//! - `owner` becomes equality on `owner.type` and `owner.id`.
//! - Each top-level match expression is ANDed with the rest.
//! - An equality on `_id`/`id` compares against the native identity; its
//!   value must parse as a [`RecordId`].
//! - A limit of 0 means no limit.
//!
//! Any compilation failure is reported as [`Fail::Query`].

use warden_core::{Fail, FieldPath, MatchExpr, QuerySpec, RecordId, SortSpec};

use crate::filter::StoreFilter;

/// A compiled query ready for a store
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Native filter
    pub filter: StoreFilter,
    /// Sort key
    pub sort: Option<SortSpec>,
    /// Maximum number of records
    pub limit: Option<usize>,
}

impl CompiledQuery {
    /// Whether the query limits its results
    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    /// Whether the query sorts its results
    pub fn has_sort(&self) -> bool {
        self.sort.is_some()
    }
}

/// Compile a query specification into the store-native representation
pub fn compile_query(spec: &QuerySpec) -> Result<CompiledQuery, Fail> {
    let mut conjuncts = Vec::new();

    if let Some(ids) = &spec.ids {
        conjuncts.push(StoreFilter::IdIn(parse_ids(ids)?));
    }

    if let Some(owner) = &spec.owner {
        conjuncts.push(StoreFilter::And(vec![
            StoreFilter::eq(FieldPath::root().key("owner").key("type"), owner.kind.clone()),
            StoreFilter::eq(FieldPath::root().key("owner").key("id"), owner.id.clone()),
        ]));
    }

    for expr in &spec.matches {
        conjuncts.push(compile_expr(expr)?);
    }

    Ok(CompiledQuery {
        filter: StoreFilter::all_of(conjuncts),
        sort: spec.sort.clone(),
        limit: spec.limit.filter(|limit| *limit > 0),
    })
}

/// Compile a single match expression
pub fn compile_expr(expr: &MatchExpr) -> Result<StoreFilter, Fail> {
    match expr {
        MatchExpr::Equals { param, value } if param.is_identity() => {
            let id = value.as_str().ok_or(Fail::Query)?;
            let id: RecordId = id.parse().map_err(|_| Fail::Query)?;
            Ok(StoreFilter::IdIn(vec![id]))
        }
        MatchExpr::Equals { param, value } => {
            if param.is_empty() {
                return Err(Fail::Query);
            }
            Ok(StoreFilter::Eq {
                path: param.clone(),
                value: value.clone(),
            })
        }
        MatchExpr::And { children } => Ok(StoreFilter::And(
            children.iter().map(compile_expr).collect::<Result<_, _>>()?,
        )),
        MatchExpr::Or { children } => Ok(StoreFilter::Or(
            children.iter().map(compile_expr).collect::<Result<_, _>>()?,
        )),
    }
}

fn parse_ids(ids: &[String]) -> Result<Vec<RecordId>, Fail> {
    ids.iter()
        .map(|id| id.parse::<RecordId>().map_err(|_| Fail::Query))
        .collect()
}
