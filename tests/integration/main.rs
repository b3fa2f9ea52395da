mod helpers {
    pub mod config;
    #[cfg(feature = "docker")]
    pub mod docker;
    pub mod http;
    pub mod identity;
    pub mod server;
}
mod logout;
mod memcookie;
#[cfg(feature = "docker")]
mod memcached;
