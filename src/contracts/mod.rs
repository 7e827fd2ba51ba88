pub mod bridge_token;
