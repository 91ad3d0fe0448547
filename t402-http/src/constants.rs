//! Header names and defaults for the x402 HTTP boundary.

/// V2 header carrying the base64 402 challenge.
pub const HEADER_PAYMENT_REQUIRED: &str = "PAYMENT-REQUIRED";

/// V2 header carrying the base64 signed payment payload.
pub const HEADER_PAYMENT_SIGNATURE: &str = "PAYMENT-SIGNATURE";

/// V2 header carrying the base64 settlement response.
pub const HEADER_PAYMENT_RESPONSE: &str = "PAYMENT-RESPONSE";

/// Legacy V1 header carrying the base64 signed payment payload.
pub const HEADER_X_PAYMENT: &str = "X-PAYMENT";

/// Legacy V1 header carrying the base64 settlement response.
pub const HEADER_X_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

/// Default remote facilitator endpoint.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";
