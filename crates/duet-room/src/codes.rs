//! Room code generation.

use duet_protocol::RoomCode;
use rand::Rng;

/// Produces candidate room codes.
///
/// Candidates need not be unique; the store rejects any code that is
/// already live and the manager asks again.
pub trait CodeGenerator: Send + Sync {
    fn next_code(&self) -> RoomCode;
}

/// Uniformly random [`RoomCode::LEN`]-character codes over
/// [`RoomCode::ALPHABET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn next_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        let code: String = (0..RoomCode::LEN)
            .map(|_| {
                let i = rng.random_range(0..RoomCode::ALPHABET.len());
                char::from(RoomCode::ALPHABET[i])
            })
            .collect();
        RoomCode::new(code)
    }
}
