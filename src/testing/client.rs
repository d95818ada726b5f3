//! Test client for protocol-level testing
//!
//! A TestClient stands in for a client connection. Requests go straight to
//! the compositor's handlers and protocol errors posted back are recorded,
//! so tests can check what a real client would have seen.

use crate::protocol::{ClientHandle, ClientId, ObjectId};

#[derive(Debug)]
pub struct TestClient {
    id: ClientId,
    next_object: u32,
    /// Objects a no-memory error was posted on.
    pub no_memory: Vec<ObjectId>,
}

impl TestClient {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            // Object 1 is the display.
            next_object: 2,
            no_memory: Vec::new(),
        }
    }

    /// Allocate the next client-side object id.
    pub fn new_object(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        id
    }
}

impl ClientHandle for TestClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn post_no_memory(&mut self, resource: ObjectId) {
        self.no_memory.push(resource);
    }
}
