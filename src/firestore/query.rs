use firestore_grpc::v1::structured_query::{
    composite_filter::Operator as CompositeOperator, field_filter::Operator as FieldOperator,
    filter::FilterType, CompositeFilter, FieldFilter, FieldReference, Filter as GrpcFilter,
};
use serde::Serialize;

use crate::error::FirebaseError;

use super::value::serialize_to_value;

/// Comparison that Firestore applies between a document field and the filter
/// value. The comparison happens server-side; see the [official Firestore
/// documentation](https://firebase.google.com/docs/firestore/query-data/queries#query_operators)
/// for which operators are supported on which field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
}

impl Operator {
    fn code(self) -> FieldOperator {
        match self {
            Self::Equal => FieldOperator::Equal,
            Self::NotEqual => FieldOperator::NotEqual,
            Self::LessThan => FieldOperator::LessThan,
            Self::LessThanOrEqual => FieldOperator::LessThanOrEqual,
            Self::GreaterThan => FieldOperator::GreaterThan,
            Self::GreaterThanOrEqual => FieldOperator::GreaterThanOrEqual,
            Self::ArrayContains => FieldOperator::ArrayContains,
        }
    }
}

/// A conjunction of field conditions for a collection query.
///
/// Build one with [`filter`] and narrow it with [`Filter::and`]. The filter
/// value can be anything serializable, but you will usually want a primitive:
///
/// ```
/// use kindling::firestore::{filter, Operator};
///
/// let museums = filter("type", Operator::Equal, "museum")
///     .unwrap()
///     .and("visitors", Operator::GreaterThan, 100_000)
///     .unwrap();
/// ```
pub struct Filter {
    conditions: Vec<FieldFilter>,
}

/// Creates a filter with a single field condition.
///
/// Fails if the value cannot be converted to a Firestore value.
pub fn filter<T: Serialize>(
    field: impl Into<String>,
    op: Operator,
    value: T,
) -> Result<Filter, FirebaseError> {
    Ok(Filter {
        conditions: vec![field_condition(field.into(), op, &value)?],
    })
}

impl Filter {
    /// Adds another condition that must hold as well.
    pub fn and<T: Serialize>(
        mut self,
        field: impl Into<String>,
        op: Operator,
        value: T,
    ) -> Result<Self, FirebaseError> {
        self.conditions.push(field_condition(field.into(), op, &value)?);
        Ok(self)
    }

    pub(crate) fn into_grpc(mut self) -> GrpcFilter {
        let filter_type = if self.conditions.len() == 1 {
            FilterType::FieldFilter(self.conditions.remove(0))
        } else {
            FilterType::CompositeFilter(CompositeFilter {
                op: CompositeOperator::And as i32,
                filters: self
                    .conditions
                    .into_iter()
                    .map(|field_filter| GrpcFilter {
                        filter_type: Some(FilterType::FieldFilter(field_filter)),
                    })
                    .collect(),
            })
        };

        GrpcFilter {
            filter_type: Some(filter_type),
        }
    }
}

fn field_condition<T: Serialize>(
    field: String,
    op: Operator,
    value: &T,
) -> Result<FieldFilter, FirebaseError> {
    let value = serialize_to_value(value)?;

    Ok(FieldFilter {
        field: Some(FieldReference { field_path: field }),
        op: op.code() as i32,
        value: Some(value),
    })
}

#[cfg(test)]
mod tests {
    use firestore_grpc::v1::{value::ValueType, Value};

    use super::*;

    #[test]
    fn single_condition() {
        let serialized = filter("age", Operator::Equal, 42).unwrap().into_grpc();

        let expected = GrpcFilter {
            filter_type: Some(FilterType::FieldFilter(FieldFilter {
                field: Some(FieldReference {
                    field_path: "age".to_string(),
                }),
                op: FieldOperator::Equal as i32,
                value: Some(Value {
                    value_type: Some(ValueType::IntegerValue(42)),
                }),
            })),
        };

        assert_eq!(serialized, expected);
    }

    #[test]
    fn combined_conditions() {
        let serialized = filter("age", Operator::LessThan, 42)
            .unwrap()
            .and("name", Operator::Equal, "Bob")
            .unwrap()
            .into_grpc();

        let expected = GrpcFilter {
            filter_type: Some(FilterType::CompositeFilter(CompositeFilter {
                op: CompositeOperator::And as i32,
                filters: vec![
                    GrpcFilter {
                        filter_type: Some(FilterType::FieldFilter(FieldFilter {
                            field: Some(FieldReference {
                                field_path: "age".to_string(),
                            }),
                            op: FieldOperator::LessThan as i32,
                            value: Some(Value {
                                value_type: Some(ValueType::IntegerValue(42)),
                            }),
                        })),
                    },
                    GrpcFilter {
                        filter_type: Some(FilterType::FieldFilter(FieldFilter {
                            field: Some(FieldReference {
                                field_path: "name".to_string(),
                            }),
                            op: FieldOperator::Equal as i32,
                            value: Some(Value {
                                value_type: Some(ValueType::StringValue("Bob".to_string())),
                            }),
                        })),
                    },
                ],
            })),
        };

        assert_eq!(serialized, expected);
    }

    #[test]
    fn implements_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Filter>();
    }
}
