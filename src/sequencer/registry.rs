use std::fmt;

use super::DispatchFn;
use crate::events::ClientId;

pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// `Some` makes the client a destination; `None` a source only.
    pub callback: Option<DispatchFn>,
}

impl Client {
    pub fn is_destination(&self) -> bool {
        self.callback.is_some()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("destination", &self.is_destination())
            .finish()
    }
}

/// Live clients in registration order.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Client>,
    last_id: u32,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids start at 1 and are never handed out twice.
    pub fn register(&mut self, name: &str, callback: Option<DispatchFn>) -> ClientId {
        self.last_id += 1;
        let id = ClientId(self.last_id);
        self.clients.push(Client {
            id,
            name: name.to_string(),
            callback,
        });
        id
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let index = self.clients.iter().position(|c| c.id == id)?;
        Some(self.clients.remove(index))
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_destination(&self, id: ClientId) -> bool {
        self.get(id).is_some_and(Client::is_destination)
    }

    pub fn name_of(&self, id: ClientId) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    pub fn id_at(&self, index: usize) -> Option<ClientId> {
        self.clients.get(index).map(|c| c.id)
    }
}
