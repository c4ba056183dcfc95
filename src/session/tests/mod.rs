mod error_channel_tests;
