//! OTP token decoding: the modhex codec and the AES-128 block decoder.

pub mod decode;
pub mod modhex;

pub use decode::{Otp, OtpError, PUBLIC_ID_LEN, TOKEN_LEN};
