//! Hand-off to the request handling layer.

use crate::definition::FormDefinition;

/// A form definition bound to a request and a response.
///
/// The request and response are opaque to this crate; whatever executes the
/// form decides what they are.
#[derive(Debug)]
pub struct FormRuntime<Req, Res> {
    definition: FormDefinition,
    request: Req,
    response: Res,
}

impl<Req, Res> FormRuntime<Req, Res> {
    pub(crate) fn new(definition: FormDefinition, request: Req, response: Res) -> Self {
        Self {
            definition,
            request,
            response,
        }
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn request(&self) -> &Req {
        &self.request
    }

    pub fn response(&self) -> &Res {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Res {
        &mut self.response
    }

    /// Give back the definition and both handles.
    pub fn into_parts(self) -> (FormDefinition, Req, Res) {
        (self.definition, self.request, self.response)
    }
}
