// Mock implementations for adapter layer testing

pub mod mock_discord;
pub mod mock_reporter;

pub use mock_discord::{
    MockDiscordService, RecordedDelete, create_message_with_id, create_test_message,
    old_message_id, recent_message_id,
};
pub use mock_reporter::MockReporter;
