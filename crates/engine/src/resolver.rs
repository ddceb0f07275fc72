//! Column resolution.
//!
//! At booking time a column name resolves to a temporary column visible on
//! the path to the node, or else to a source column. Types are checked
//! against the closure's pinned argument types, or guessed from the schema
//! for operations that accept any numeric column. At the start of a
//! run-cycle each slot then turns the resolved bindings into concrete
//! readers on its own cursor.

use crate::graph::{ColumnBinding, NodeId, Temporary};
use hashbrown::HashMap;
use rowflow_core::{Cursor, DataType, Error, ReaderId, Result, Schema};

/// Picks the column names of a booking, falling back to the configured
/// defaults when none are given.
pub(crate) fn pick_columns(
    label: &str,
    given: &[&str],
    arity: usize,
    defaults: &[String],
) -> Result<Vec<String>> {
    if given.is_empty() && arity > 0 {
        if defaults.len() < arity {
            return Err(Error::missing_default_columns(label, arity, defaults.len()));
        }
        return Ok(defaults[..arity].to_vec());
    }
    if given.len() != arity {
        return Err(Error::arity_mismatch(label, arity, given.len()));
    }
    Ok(given.iter().map(|c| c.to_string()).collect())
}

/// Resolves column names for a node booked below a given parent.
pub(crate) struct ColumnResolver<'a> {
    schema: &'a Schema,
    temporaries: &'a [Temporary],
}

impl<'a> ColumnResolver<'a> {
    pub(crate) fn new(schema: &'a Schema, temporaries: &'a [Temporary]) -> Self {
        Self { schema, temporaries }
    }

    /// Resolves one name. Temporary columns shadow nothing: a define can
    /// never reuse a source column name.
    pub(crate) fn resolve(&self, name: &str) -> Result<(ColumnBinding, Option<DataType>)> {
        if let Some(t) = self.temporaries.iter().find(|t| t.name == name) {
            return Ok((
                ColumnBinding::Define {
                    name: name.to_string(),
                    node: t.node,
                },
                t.data_type,
            ));
        }
        match self.schema.data_type(name) {
            Some(ty) => Ok((ColumnBinding::Source { name: name.to_string() }, Some(ty))),
            None => Err(Error::column_not_found(name)),
        }
    }

    /// Resolves `names` and checks them against the pinned argument types.
    ///
    /// An untyped argument accepts any column; an untyped define is checked
    /// when its value is converted.
    pub(crate) fn bind_typed(
        &self,
        names: &[String],
        pinned: &[Option<DataType>],
    ) -> Result<Vec<ColumnBinding>> {
        names
            .iter()
            .zip(pinned)
            .map(|(name, pinned)| {
                let (binding, resolved) = self.resolve(name)?;
                match (pinned, resolved) {
                    (Some(expected), Some(got)) if *expected != got => {
                        Err(Error::type_mismatch(name.as_str(), *expected, Some(got)))
                    }
                    _ => Ok(binding),
                }
            })
            .collect()
    }

    /// Resolves a column whose type is guessed and must be numeric.
    pub(crate) fn bind_numeric(&self, name: &str) -> Result<(ColumnBinding, DataType)> {
        let (binding, resolved) = self.resolve(name)?;
        match resolved {
            Some(ty) if ty.is_numeric_like() => Ok((binding, ty)),
            Some(ty) => Err(Error::unsupported_type(
                name,
                format!("{} is not a number or a sequence of numbers", ty),
            )),
            None => Err(Error::unsupported_type(
                name,
                "the type of an untyped define cannot be guessed; use an explicit type",
            )),
        }
    }

    /// Checks that `name` is free to be used by a new define.
    pub(crate) fn check_new_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("a define needs a column name"));
        }
        if self.schema.contains(name) || self.temporaries.iter().any(|t| t.name == name) {
            return Err(Error::duplicate_column(name));
        }
        Ok(())
    }
}

/// A column binding made concrete for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotColumn {
    Reader(ReaderId),
    Define(NodeId),
}

/// Binds source readers on one slot's cursor, sharing a reader between every
/// node reading the same column.
pub(crate) struct SlotBinder<'c, 'a> {
    cursor: &'c mut (dyn Cursor + 'a),
    readers: HashMap<String, ReaderId>,
}

impl<'c, 'a> SlotBinder<'c, 'a> {
    pub(crate) fn new(cursor: &'c mut (dyn Cursor + 'a)) -> Self {
        Self {
            cursor,
            readers: HashMap::new(),
        }
    }

    pub(crate) fn bind(&mut self, binding: &ColumnBinding) -> Result<SlotColumn> {
        match binding {
            ColumnBinding::Define { node, .. } => Ok(SlotColumn::Define(*node)),
            ColumnBinding::Source { name } => {
                if let Some(reader) = self.readers.get(name) {
                    return Ok(SlotColumn::Reader(*reader));
                }
                let reader = self.cursor.bind(name)?;
                self.readers.insert(name.clone(), reader);
                Ok(SlotColumn::Reader(reader))
            }
        }
    }

    /// Number of distinct source readers bound so far.
    pub(crate) fn readers(&self) -> usize {
        self.readers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowflow_core::{ColumnSource, MemoryTable};

    fn schema() -> Schema {
        Schema::from_columns([
            ("x", DataType::Int64),
            ("name", DataType::String),
            ("hits", DataType::Float32Array),
        ])
        .unwrap()
    }

    fn temporaries() -> Vec<Temporary> {
        vec![
            Temporary {
                name: "y".into(),
                node: 3,
                data_type: Some(DataType::Float64),
            },
            Temporary {
                name: "any".into(),
                node: 4,
                data_type: None,
            },
        ]
    }

    #[test]
    fn test_pick_columns() {
        let defaults = vec!["a".to_string(), "b".to_string()];
        assert_eq!(pick_columns("filter", &["x"], 1, &defaults).unwrap(), vec!["x"]);
        assert_eq!(pick_columns("filter", &[], 2, &defaults).unwrap(), vec!["a", "b"]);
        assert_eq!(pick_columns("count", &[], 0, &[]).unwrap(), Vec::<String>::new());
        assert_eq!(
            pick_columns("take", &[], 3, &defaults).unwrap_err(),
            Error::missing_default_columns("take", 3, 2)
        );
        assert_eq!(
            pick_columns("filter", &["x", "y"], 1, &defaults).unwrap_err(),
            Error::arity_mismatch("filter", 1, 2)
        );
    }

    #[test]
    fn test_resolve_prefers_temporaries() {
        let schema = schema();
        let temps = temporaries();
        let resolver = ColumnResolver::new(&schema, &temps);
        let (binding, ty) = resolver.resolve("y").unwrap();
        assert_eq!(binding, ColumnBinding::Define { name: "y".into(), node: 3 });
        assert_eq!(ty, Some(DataType::Float64));
        let (binding, ty) = resolver.resolve("x").unwrap();
        assert_eq!(binding.name(), "x");
        assert_eq!(ty, Some(DataType::Int64));
        assert_eq!(resolver.resolve("zz").unwrap_err(), Error::column_not_found("zz"));
    }

    #[test]
    fn test_bind_typed() {
        let schema = schema();
        let temps = temporaries();
        let resolver = ColumnResolver::new(&schema, &temps);
        let names = vec!["x".to_string(), "y".to_string(), "any".to_string()];
        let ok = resolver
            .bind_typed(&names, &[Some(DataType::Int64), None, Some(DataType::Int32)])
            .unwrap();
        assert_eq!(ok.len(), 3);
        let err = resolver
            .bind_typed(&names[..1], &[Some(DataType::Int32)])
            .unwrap_err();
        assert_eq!(err, Error::type_mismatch("x", DataType::Int32, Some(DataType::Int64)));
    }

    #[test]
    fn test_bind_numeric() {
        let schema = schema();
        let temps = temporaries();
        let resolver = ColumnResolver::new(&schema, &temps);
        assert_eq!(resolver.bind_numeric("hits").unwrap().1, DataType::Float32Array);
        assert!(matches!(
            resolver.bind_numeric("name"),
            Err(Error::UnsupportedType { .. })
        ));
        assert!(matches!(
            resolver.bind_numeric("any"),
            Err(Error::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_check_new_name() {
        let schema = schema();
        let temps = temporaries();
        let resolver = ColumnResolver::new(&schema, &temps);
        assert!(resolver.check_new_name("z").is_ok());
        assert_eq!(resolver.check_new_name("x").unwrap_err(), Error::duplicate_column("x"));
        assert_eq!(resolver.check_new_name("y").unwrap_err(), Error::duplicate_column("y"));
        assert!(resolver.check_new_name("").is_err());
    }

    #[test]
    fn test_slot_binder_shares_readers() {
        let table = MemoryTable::builder()
            .column("x", vec![1i64, 2])
            .column("z", vec![1.0f64, 2.0])
            .build()
            .unwrap();
        let mut cursor = table.open_cursor(0, 0..2).unwrap();
        let mut binder = SlotBinder::new(cursor.as_mut());
        let x = ColumnBinding::Source { name: "x".into() };
        let a = binder.bind(&x).unwrap();
        let b = binder.bind(&x).unwrap();
        assert_eq!(a, b);
        binder.bind(&ColumnBinding::Source { name: "z".into() }).unwrap();
        assert_eq!(
            binder.bind(&ColumnBinding::Define { name: "y".into(), node: 7 }).unwrap(),
            SlotColumn::Define(7)
        );
        assert_eq!(binder.readers(), 2);
    }
}
