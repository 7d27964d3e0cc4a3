pub mod asset_transport;
