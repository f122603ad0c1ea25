pub(crate) mod payment_handlers;
pub(crate) mod token_handlers;
