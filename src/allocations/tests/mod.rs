mod common;
mod exclusions;
