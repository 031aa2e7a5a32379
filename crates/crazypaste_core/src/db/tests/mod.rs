//! Database integration tests.

use super::*;
use crate::error::AppError;
use crate::models::paste::CreatePasteRequest;
use crate::test_support::{memory_db, register, setup_temp_db};

mod backup;
