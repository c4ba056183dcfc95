mod memory_reader_tests;
