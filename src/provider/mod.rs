pub use self::{
    http::{FetchParams, HTTP},
    transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport},
};

#[cfg(test)]
pub(crate) use self::mock::MockTransport;

mod http;
#[cfg(test)]
mod mock;
mod transport;
