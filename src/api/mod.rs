pub mod hibp_api;
