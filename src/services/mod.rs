pub(crate) mod callback_verifier;
pub(crate) mod payment_service;
pub(crate) mod phonepe_service;
pub(crate) mod token_manager;

#[cfg(test)]
pub(crate) mod testing;
