pub mod efficacy_queries;
