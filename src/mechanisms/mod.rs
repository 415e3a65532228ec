pub mod randomized_response;
