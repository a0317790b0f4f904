use uuid::Uuid;

/// External customer registry
///
/// Customers are owned by another subsystem; the ledger only needs to tell an
/// unknown customer apart from a known one with no loyalty activity yet.
#[mockall::automock]
#[async_trait::async_trait]
pub trait CustomerPort {
    async fn get_customer(&self, customer_id: Uuid) -> Result<Customer, Error>;
}

pub struct Customer {
    pub customer_id: Uuid,
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when a customer does not exist
    #[error("customer {0} does not exist")]
    CustomerDoesNotExist(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not
    /// part of the domain model, such as connectivity, configuration, or
    /// permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
