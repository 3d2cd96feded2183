use crate::bse::screener::model::{HeaderPath, PathSegment, Record, Scalar};

/// Follows `path` into `record` and returns the scalar found there.
///
/// Missing keys, out-of-range indices, stepping into a scalar, and landing on
/// a container all yield `None`, as does an explicit JSON `null`.
pub fn resolve<'a>(record: &'a Record, path: &HeaderPath) -> Option<&'a Scalar> {
    let mut current = record;
    for segment in path.segments() {
        current = match (current, segment) {
            (Record::Mapping(mapping), PathSegment::Key(key)) => mapping.get(key)?,
            (Record::Sequence(items), PathSegment::Index(index)) => items.get(*index)?,
            _ => return None,
        };
    }

    match current {
        Record::Scalar(Scalar::Null) => None,
        Record::Scalar(scalar) => Some(scalar),
        Record::Sequence(_) | Record::Mapping(_) => None,
    }
}
