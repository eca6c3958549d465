// Test modules for the sync core
// Each module exercises one component; shared fakes live in `support`

mod support;
