use std::fmt::Display;
use std::future;
use std::pin::Pin;

use anyhow::{anyhow, Context};
use firestore_grpc::tonic;
use firestore_grpc::tonic::{
    codegen::InterceptedService, metadata::MetadataValue, transport::Channel, Request, Status,
};
use firestore_grpc::v1::firestore_client::FirestoreClient as GrpcFirestoreClient;
use firestore_grpc::v1::precondition::ConditionType;
use firestore_grpc::v1::run_query_request::QueryType;
use firestore_grpc::v1::structured_query::CollectionSelector;
use firestore_grpc::v1::{
    CreateDocumentRequest, DeleteDocumentRequest, Document, DocumentMask, GetDocumentRequest,
    Precondition, RunQueryRequest, StructuredQuery, UpdateDocumentRequest,
};
use futures::{Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FirebaseError;
use crate::ServiceAccount;

use super::query::Filter;
use super::reference::{CollectionReference, DocumentReference};
use super::token_provider::FirestoreTokenProvider;
use super::value::{deserialize_fields, serialize_to_fields};

mod options;

pub use options::FirestoreClientOptions;

type DocumentStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T, FirebaseError>> + Send + 'a>>;

type InterceptorFunction = Box<dyn FnMut(Request<()>) -> Result<Request<()>, Status> + Send>;

/// Client for the document database of a Firebase project.
///
/// Obtained from [`FirebaseApp::firestore`](crate::FirebaseApp::firestore) or
/// constructed directly with [`FirestoreClient::initialise`]. All handles
/// cloned from the same client share one gRPC channel.
pub struct FirestoreClient {
    options: FirestoreClientOptions,
    client: GrpcFirestoreClient<InterceptedService<Channel, InterceptorFunction>>,
    grpc_channel: Channel,
    project_id: String,
    token_provider: FirestoreTokenProvider,
    root_resource_path: String,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self::from_channel(
            self.grpc_channel.clone(),
            self.token_provider.clone(),
            &self.project_id,
            self.options.clone(),
        )
    }
}

fn create_auth_interceptor(mut token_provider: FirestoreTokenProvider) -> InterceptorFunction {
    Box::new(move |mut req: Request<()>| {
        let token = token_provider
            .get_token()
            .map_err(|_| Status::unauthenticated("Could not get token from token provider"))?;

        let bearer_token = format!("Bearer {token}");
        let mut header_value = MetadataValue::from_str(&bearer_token).map_err(|_| {
            Status::unauthenticated("Failed to construct metadata value for authorization token")
        })?;
        header_value.set_sensitive(true);

        req.metadata_mut().insert("authorization", header_value);

        Ok(req)
    })
}

impl FirestoreClient {
    /// Initialise a new client that can be used to interact with a Firestore
    /// database.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use kindling::firestore::client::{FirestoreClient, FirestoreClientOptions};
    /// use kindling::ServiceAccount;
    ///
    /// let service_account = ServiceAccount::from_file("./service-account.json")?;
    /// let mut client =
    ///     FirestoreClient::initialise(service_account, FirestoreClientOptions::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn initialise(
        service_account: ServiceAccount,
        options: FirestoreClientOptions,
    ) -> Result<Self, FirebaseError> {
        let channel = Channel::from_shared(options.host_url.clone())
            .context("Failed to create gRPC channel")?
            .connect()
            .await?;

        let project_id = service_account.project_id.clone();
        let token_provider = FirestoreTokenProvider::new(service_account);

        Ok(Self::from_channel(
            channel,
            token_provider,
            &project_id,
            options,
        ))
    }

    fn from_channel(
        channel: Channel,
        token_provider: FirestoreTokenProvider,
        project_id: &str,
        options: FirestoreClientOptions,
    ) -> Self {
        // Cloning a channel is cheap and encouraged by tonic's documentation.
        let service = GrpcFirestoreClient::with_interceptor(
            channel.clone(),
            create_auth_interceptor(token_provider.clone()),
        );

        let resource_path = format!(
            "projects/{project_id}/databases/{}/documents",
            options.database_id
        );

        Self {
            client: service,
            project_id: project_id.to_string(),
            token_provider,
            grpc_channel: channel,
            root_resource_path: resource_path,
            options,
        }
    }

    /// Retrieve the document at the given reference, or `None` if it does not
    /// exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # use serde::Deserialize;
    /// # use kindling::firestore::collection;
    /// # let mut client = kindling::FirebaseApp::from_env().await?.firestore();
    /// #[derive(Debug, Deserialize)]
    /// struct Person {
    ///     name: String,
    /// }
    ///
    /// let doc = client
    ///     .get_document::<Person>(&collection("people").doc("luke"))
    ///     .await?;
    ///
    /// match doc {
    ///     Some(person) => println!("Found {}", person.name),
    ///     None => println!("No such person"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_document<T: DeserializeOwned>(
        &mut self,
        doc_ref: &DocumentReference,
    ) -> Result<Option<T>, FirebaseError> {
        let request = GetDocumentRequest {
            name: self.get_name_with(doc_ref),
            mask: None,
            consistency_selector: None,
        };

        let res = self.client.get_document(request).await;

        match res {
            Ok(res) => {
                let doc = res.into_inner();
                let deserialized = deserialize_fields::<T>(doc.fields)
                    .map_err(|e| value_err_with_doc(e, &doc.name))?;
                Ok(Some(deserialized))
            }
            Err(err) if err.code() == tonic::Code::NotFound => Ok(None),
            Err(err) => Err(anyhow!(err).into()),
        }
    }

    /// Creates a document in the given collection, letting Firestore generate
    /// the document ID. The generated ID is returned.
    pub async fn create_document<T: Serialize>(
        &mut self,
        collection_ref: &CollectionReference,
        document: &T,
    ) -> Result<String, FirebaseError> {
        self.create_document_internal(collection_ref, None, document)
            .await
    }

    /// Creates a document at the given reference, failing with
    /// [`DocumentAlreadyExists`](FirebaseError::DocumentAlreadyExists) if a
    /// document already lives there. Returns the document ID.
    pub async fn create_document_at_ref<T: Serialize>(
        &mut self,
        doc_ref: &DocumentReference,
        document: &T,
    ) -> Result<String, FirebaseError> {
        self.create_document_internal(&doc_ref.parent(), Some(doc_ref.id().to_string()), document)
            .await
    }

    async fn create_document_internal<T: Serialize>(
        &mut self,
        collection_ref: &CollectionReference,
        document_id: Option<String>,
        document: &T,
    ) -> Result<String, FirebaseError> {
        // Per Google's API reference, a document sent in a create request
        // must carry neither name nor timestamps.
        let doc = Document {
            name: String::new(),
            fields: serialize_to_fields(document)?,
            create_time: None,
            update_time: None,
        };

        let (parent, collection_id) = self.split_collection_parent_and_name(collection_ref);
        let request = CreateDocumentRequest {
            parent,
            collection_id,
            // An empty string makes Firestore generate a document ID for us.
            document_id: document_id.unwrap_or_default(),
            document: Some(doc),
            mask: Some(DocumentMask {
                field_paths: vec![],
            }),
        };

        let res = self.client.create_document(request).await;

        match res {
            Ok(r) => {
                let created_doc = r.into_inner();
                let created_doc_id = created_doc
                    .name
                    .rsplit_once('/')
                    .map(|(_, id)| id.to_string())
                    .context("Could not get document ID from resource path")?;
                Ok(created_doc_id)
            }
            Err(err) if err.code() == tonic::Code::AlreadyExists => Err(
                FirebaseError::DocumentAlreadyExists(err.message().to_string()),
            ),
            Err(err) => Err(anyhow!(err).into()),
        }
    }

    /// Sets the document at the given reference, creating it if it does not
    /// exist and overwriting it if it does.
    pub async fn set_document<T: Serialize>(
        &mut self,
        doc_ref: &DocumentReference,
        document: &T,
    ) -> Result<(), FirebaseError> {
        let request = UpdateDocumentRequest {
            document: Some(self.serialize_at(doc_ref, document)?),
            update_mask: None,
            mask: Some(DocumentMask {
                field_paths: vec![],
            }),
            current_document: None,
        };

        self.client
            .update_document(request)
            .await
            .map_err(|err| anyhow!(err))?;

        Ok(())
    }

    /// Overwrites the document at the given reference, failing with
    /// [`DocumentNotfound`](FirebaseError::DocumentNotfound) if there is no
    /// document to update. Use [`set_document`](Self::set_document) for
    /// create-or-overwrite behavior.
    pub async fn update_document<T: Serialize>(
        &mut self,
        doc_ref: &DocumentReference,
        document: &T,
    ) -> Result<(), FirebaseError> {
        let request = UpdateDocumentRequest {
            document: Some(self.serialize_at(doc_ref, document)?),
            update_mask: None,
            mask: Some(DocumentMask {
                field_paths: vec![],
            }),
            current_document: document_exists_precondition(),
        };

        self.client
            .update_document(request)
            .await
            .map_err(not_found_err())?;

        Ok(())
    }

    /// Deletes the document at the given reference. Deleting a document that
    /// does not exist is not an error.
    pub async fn delete_document(
        &mut self,
        doc_ref: &DocumentReference,
    ) -> Result<(), FirebaseError> {
        let request = DeleteDocumentRequest {
            name: self.get_name_with(doc_ref),
            current_document: None,
        };

        self.client
            .delete_document(request)
            .await
            .context("Failed to delete document")?;

        Ok(())
    }

    /// Fetches all documents in the given collection, as a stream of results.
    /// Documents without fields ("missing documents" in Firebase terms) are
    /// skipped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # use kindling::firestore::collection;
    /// # let mut client = kindling::FirebaseApp::from_env().await?.firestore();
    /// use futures::TryStreamExt;
    ///
    /// let people: Vec<serde_json::Value> = client
    ///     .get_documents(&collection("people"))
    ///     .await?
    ///     .try_collect()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_documents<'a, T: DeserializeOwned + 'a>(
        &'a mut self,
        collection_ref: &CollectionReference,
    ) -> Result<DocumentStream<'a, T>, FirebaseError> {
        let (parent, collection_id) = self.split_collection_parent_and_name(collection_ref);

        self.run_query_internal(parent, collection_id, None, None)
            .await
    }

    /// Queries a collection for documents that pass the given filter,
    /// returning a stream of results.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # use kindling::firestore::collection;
    /// # let mut client = kindling::FirebaseApp::from_env().await?.firestore();
    /// use futures::TryStreamExt;
    /// use kindling::firestore::{filter, Operator};
    ///
    /// let museums: Vec<serde_json::Value> = client
    ///     .query(
    ///         &collection("landmarks"),
    ///         filter("type", Operator::Equal, "museum")?,
    ///     )
    ///     .await?
    ///     .try_collect()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query<'a, T: DeserializeOwned + 'a>(
        &'a mut self,
        collection_ref: &CollectionReference,
        filter: Filter,
    ) -> Result<DocumentStream<'a, T>, FirebaseError> {
        let (parent, collection_id) = self.split_collection_parent_and_name(collection_ref);

        self.run_query_internal(parent, collection_id, Some(filter), None)
            .await
    }

    /// The same as [`query`](Self::query), but only returns the first result,
    /// if any.
    pub async fn query_one<T: DeserializeOwned>(
        &mut self,
        collection_ref: &CollectionReference,
        filter: Filter,
    ) -> Result<Option<T>, FirebaseError> {
        let (parent, collection_id) = self.split_collection_parent_and_name(collection_ref);

        let mut stream = self
            .run_query_internal(parent, collection_id, Some(filter), Some(1))
            .await?;

        stream.try_next().await
    }

    async fn run_query_internal<'a, T: DeserializeOwned + 'a>(
        &'a mut self,
        parent: String,
        collection_id: String,
        filter: Option<Filter>,
        limit: Option<i32>,
    ) -> Result<DocumentStream<'a, T>, FirebaseError> {
        let structured_query = StructuredQuery {
            select: None,
            from: vec![CollectionSelector {
                collection_id,
                all_descendants: false,
            }],
            r#where: filter.map(Filter::into_grpc),
            order_by: vec![],
            start_at: None,
            end_at: None,
            offset: 0,
            limit,
        };

        let request = RunQueryRequest {
            parent,
            query_type: Some(QueryType::StructuredQuery(structured_query)),
            consistency_selector: None,
        };

        let res = self
            .client
            .run_query(request)
            .await
            .context("Failed to run query")?;

        let doc_stream = res
            .into_inner()
            // Some of the "results" in the gRPC stream carry no document but
            // only query progress information, which we skip over.
            .filter_map(|res| future::ready(res.map(|inner| inner.document).transpose()))
            .map(|doc_res| {
                let doc = doc_res.map_err(|e| anyhow!(e))?;
                deserialize_fields::<T>(doc.fields).map_err(|e| value_err_with_doc(e, &doc.name))
            });

        Ok(doc_stream.boxed())
    }

    fn serialize_at<T: Serialize>(
        &self,
        doc_ref: &DocumentReference,
        document: &T,
    ) -> Result<Document, FirebaseError> {
        let name = self.get_name_with(doc_ref);
        let fields = serialize_to_fields(document)
            .map_err(|e| value_err_with_doc(e, &name))?;

        Ok(Document {
            name,
            fields,
            create_time: None,
            update_time: None,
        })
    }

    fn get_name_with(&self, item: impl Display) -> String {
        format!("{}/{}", self.root_resource_path, item)
    }

    fn split_collection_parent_and_name(
        &self,
        collection: &CollectionReference,
    ) -> (String, String) {
        let parent = collection
            .parent()
            .map(|p| self.get_name_with(p))
            .unwrap_or_else(|| self.root_resource_path.clone());
        let name = collection.name().to_string();

        (parent, name)
    }
}

fn value_err_with_doc(err: super::value::Error, doc: impl AsRef<str>) -> FirebaseError {
    FirebaseError::ValueError {
        source: err,
        document: Some(strip_resource_prefix(doc.as_ref())),
    }
}

/// Shortens a full resource name like
/// `projects/{project_id}/databases/{database_id}/documents/{document_path}`
/// down to the document path, for use in error messages.
fn strip_resource_prefix(name: &str) -> String {
    name.split_once("/documents/")
        .map(|(_, path)| path.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn document_exists_precondition() -> Option<Precondition> {
    Some(Precondition {
        condition_type: Some(ConditionType::Exists(true)),
    })
}

fn not_found_err() -> fn(Status) -> FirebaseError {
    |err| {
        if err.code() == tonic::Code::NotFound {
            FirebaseError::DocumentNotfound(err.message().to_string())
        } else {
            anyhow!(err).into()
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn implements_send() {
        fn assert_send<T: Send>() {}
        assert_send::<super::FirestoreClient>();
    }

    #[test]
    fn strips_resource_prefixes() {
        assert_eq!(
            super::strip_resource_prefix(
                "projects/p/databases/(default)/documents/cities/SF/landmarks/golden-gate"
            ),
            "cities/SF/landmarks/golden-gate"
        );
        assert_eq!(super::strip_resource_prefix("cities/SF"), "cities/SF");
    }
}
