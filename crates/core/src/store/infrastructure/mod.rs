pub mod http_dataset_store;
