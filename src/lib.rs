pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod state;

pub mod crypto {
    pub mod signer;
}

pub mod models {
    pub mod drawing;
    pub mod snapshot;
}

pub mod repositories {
    pub mod drawing;
}

pub mod storage {
    pub mod asset;
}

pub mod services {
    pub mod drawings;
}

pub mod handlers {
    pub mod assets;
    pub mod drawings;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod drawing;
}
