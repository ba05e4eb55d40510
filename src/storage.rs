//! In-memory storage for captured emails.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::email::Email;

/// A stored email with metadata.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    /// Unique identifier for this email.
    pub id: String,
    /// The email content.
    pub email: Email,
}

/// Thread-safe in-memory storage for emails, in capture order.
///
/// Used by [`LocalMailer`](crate::providers::LocalMailer).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    emails: RwLock<Vec<StoredEmail>>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store an email and return its ID.
    pub fn push(&self, email: Email) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.emails.write().push(StoredEmail {
            id: id.clone(),
            email,
        });
        id
    }

    /// Get an email by ID.
    pub fn get(&self, id: &str) -> Option<StoredEmail> {
        self.emails.read().iter().find(|e| e.id == id).cloned()
    }

    /// All stored emails, newest first.
    pub fn all(&self) -> Vec<StoredEmail> {
        self.emails.read().iter().rev().cloned().collect()
    }

    /// Get the count of stored emails.
    pub fn count(&self) -> usize {
        self.emails.read().len()
    }

    /// Clear all stored emails.
    pub fn clear(&self) {
        self.emails.write().clear();
    }

    /// Remove and return all stored emails, newest first.
    pub fn flush(&self) -> Vec<StoredEmail> {
        let mut drained = std::mem::take(&mut *self.emails.write());
        drained.reverse();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let storage = MemoryStorage::new();

        let id = storage.push(Email::new().to("hr@example.com").subject("First"));
        let id2 = storage.push(Email::new().to("jane@example.com").subject("Second"));
        assert_eq!(storage.count(), 2);

        assert_eq!(storage.get(&id).unwrap().email.subject, "First");
        assert_eq!(storage.all()[0].id, id2);
        assert!(storage.get("missing").is_none());

        storage.clear();
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn test_flush() {
        let storage = MemoryStorage::new();
        storage.push(Email::new().subject("First"));
        storage.push(Email::new().subject("Second"));

        let flushed = storage.flush();
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].email.subject, "Second");
        assert_eq!(storage.count(), 0);
        assert!(storage.flush().is_empty());
    }
}
