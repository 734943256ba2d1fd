//! Value types shared by matchers, expectations and the event log.

pub mod action;
pub mod body;
pub mod key_value;
pub mod nottable;
pub mod request;
pub mod times;
pub mod verification;

#[allow(unused_imports)]
pub use action::{
    Action, ActionKind, Delay, HttpClassCallback, HttpError, HttpForward, HttpObjectCallback,
    HttpResponse, HttpTemplate, Scheme, TemplateType, TimeUnit,
};
#[allow(unused_imports)]
pub use body::{Body, BodyError, JsonMatchType};
#[allow(unused_imports)]
pub use key_value::{KeyMatchStyle, KeyValuePair, MultiValueMap, MultiValueMapBuilder};
pub use nottable::{NottableString, StringKind};
pub use request::HttpRequest;
pub use times::{TimeToLive, Times};
pub use verification::{Verification, VerificationSequence, VerificationTimes};
