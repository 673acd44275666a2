use std::fmt;

/// Starts a reference to a top-level collection.
///
/// ```
/// use kindling::firestore::collection;
///
/// let doc_ref = collection("planets").doc("tatooine").collection("people").doc("luke");
/// assert_eq!(doc_ref.to_string(), "planets/tatooine/people/luke");
/// ```
pub fn collection(name: impl Into<String>) -> CollectionReference {
    CollectionReference::new(name)
}

/// A path to a collection: an alternating list of collection names and
/// document IDs with an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReference {
    segments: Vec<String>,
}

/// A path to a document: an alternating list of collection names and document
/// IDs with an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    segments: Vec<String>,
}

impl CollectionReference {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            segments: vec![collection_name.into()],
        }
    }

    /// Refers to the document with the given ID within this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentReference {
        let mut segments = self.segments.clone();
        segments.push(id.into());
        DocumentReference { segments }
    }

    /// The document this collection is nested under, if any.
    pub fn parent(&self) -> Option<DocumentReference> {
        (self.segments.len() > 1).then(|| DocumentReference {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The name of the collection itself, without any parent path.
    pub fn name(&self) -> &str {
        self.segments.last().expect("collection path is never empty")
    }
}

impl DocumentReference {
    /// Refers to a subcollection of this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionReference {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        CollectionReference { segments }
    }

    /// The collection this document belongs to.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// The ID of the document itself, without any parent path.
    pub fn id(&self) -> &str {
        self.segments.last().expect("document path is never empty")
    }
}

impl fmt::Display for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_reference() {
        assert_eq!(CollectionReference::new("users").to_string(), "users");
    }

    #[test]
    fn document_reference() {
        assert_eq!(
            CollectionReference::new("users").doc("alice").to_string(),
            "users/alice"
        );
    }

    #[test]
    fn many_nested() {
        assert_eq!(
            CollectionReference::new("planets")
                .doc("tatooine")
                .collection("people")
                .doc("luke")
                .to_string(),
            "planets/tatooine/people/luke"
        );
    }

    #[test]
    fn parents() {
        let people = collection("planets").doc("tatooine").collection("people");

        assert_eq!(people.name(), "people");
        assert_eq!(people.parent().unwrap().to_string(), "planets/tatooine");
        assert_eq!(people.doc("luke").parent(), people);
        assert_eq!(collection("planets").parent(), None);
    }
}
