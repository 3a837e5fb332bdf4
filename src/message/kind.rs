//! Message definitions
//!
//! The capability every value sent over a [`Net`](crate::transport::Net) has.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::error::Result;

/// Decodes one message body (code already stripped)
pub type MessageDecoder = Arc<dyn Fn(&mut Bytes) -> Result<Box<dyn Message>> + Send + Sync>;

/// Upcast helper so `dyn Message` can be downcast to its concrete type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A self-describing value with a stable wire code
///
/// `Debug` doubles as the diagnostic string form.
pub trait Message: AsAny + fmt::Debug + Send + Sync {
    /// Wire discriminator, unique within one registry
    fn code(&self) -> u16;

    /// Human readable kind name
    fn name(&self) -> &str;

    /// Append the message body (without the code) to `buf`
    fn serialize(&self, buf: &mut BytesMut) -> Result<()>;
}

impl dyn Message {
    /// Returns true if the message is of type `T`
    pub fn is<T: Message + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow the message as its concrete type
    pub fn downcast_ref<T: Message + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A message kind whose code is fixed at compile time
///
/// Registering a kind stores [`MessageKind::deserialize`] directly; no
/// prototype instance is kept around.
pub trait MessageKind: Message + Sized + 'static {
    const CODE: u16;

    /// Build a fresh instance from the body bytes
    fn deserialize(buf: &mut Bytes) -> Result<Self>;

    /// Type-erased decoder for this kind
    fn decoder() -> MessageDecoder {
        Arc::new(|buf: &mut Bytes| -> Result<Box<dyn Message>> {
            Ok(Box::new(Self::deserialize(buf)?))
        })
    }
}
