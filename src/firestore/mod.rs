//! # Firestore
//!
//! Client for the document database of a Firebase project. The client is
//! usually obtained from an initialised
//! [`FirebaseApp`](crate::FirebaseApp):
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = kindling::FirebaseApp::from_env().await?;
//! let mut db = app.firestore();
//! # Ok(())
//! # }
//! ```
//!
//! Documents live at slash-separated paths of alternating collection names
//! and document IDs, built with the [`collection`] function:
//!
//! ```
//! use kindling::firestore::collection;
//!
//! let doc_ref = collection("cities").doc("SF").collection("landmarks").doc("golden-gate");
//! ```
//!
//! Reading and writing goes through the methods on
//! [`FirestoreClient`](client::FirestoreClient); any `serde`-serializable
//! value whose serialized form is a JSON-like object can be stored:
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # use kindling::firestore::collection;
//! # let mut db = kindling::FirebaseApp::from_env().await?.firestore();
//! use futures::TryStreamExt;
//! use kindling::firestore::{filter, Operator};
//!
//! db.set_document(
//!     &collection("cities").doc("SF").collection("landmarks").doc("legion-honor"),
//!     &serde_json::json!({ "name": "Legion of Honor", "type": "museum" }),
//! )
//! .await?;
//!
//! let museums: Vec<serde_json::Value> = db
//!     .query(
//!         &collection("cities").doc("SF").collection("landmarks"),
//!         filter("type", Operator::Equal, "museum")?,
//!     )
//!     .await?
//!     .try_collect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod query;
pub mod reference;
mod token_provider;
pub mod value;

pub use query::{filter, Operator};
pub use reference::collection;
