pub mod fixtures;

#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod services_tests;
