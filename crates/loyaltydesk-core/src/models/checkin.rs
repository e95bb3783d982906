use serde::Serialize;

use crate::api::ApiError;

/// The eight-byte signature every PNG file starts with
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A shop check-in QR code as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct QrCode {
    pub png: Vec<u8>,
}

impl QrCode {
    pub fn from_png(png: Vec<u8>) -> Result<Self, ApiError> {
        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(ApiError::InvalidResponse(
                "QR code response is not a PNG image".into(),
            ));
        }
        Ok(Self { png })
    }
}

/// A geolocation-tagged check-in at a shop.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub shop_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckInBody {
    pub latitude: String,
    pub longitude: String,
}

impl CheckIn {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_shop_id(self.shop_id)?;
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ApiError::Validation(format!(
                "Latitude {} is out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ApiError::Validation(format!(
                "Longitude {} is out of range",
                self.longitude
            )));
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> CheckInBody {
        CheckInBody {
            latitude: self.latitude.to_string(),
            longitude: self.longitude.to_string(),
        }
    }
}

pub(crate) fn validate_shop_id(shop_id: i64) -> Result<(), ApiError> {
    if shop_id <= 0 {
        return Err(ApiError::Validation("A valid shop id is required".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct ShopRewardBody {
    pub points: i64,
}

pub(crate) fn validate_reward_points(points: i64) -> Result<(), ApiError> {
    if points <= 0 {
        return Err(ApiError::Validation("Points must be greater than zero".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_code_requires_png() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(b"IHDR");
        assert!(QrCode::from_png(png).is_ok());

        assert!(matches!(
            QrCode::from_png(b"<html>oops</html>".to_vec()),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_check_in_validation() {
        let check_in = CheckIn {
            shop_id: 3,
            latitude: 29.9759767433654,
            longitude: 30.9442681318302,
        };
        assert!(check_in.validate().is_ok());

        let body = serde_json::to_value(check_in.body()).unwrap();
        assert_eq!(body["latitude"], "29.9759767433654");

        let invalid: [fn(&mut CheckIn); 3] = [
            |c| c.shop_id = 0,
            |c| c.latitude = 91.0,
            |c| c.longitude = -181.0,
        ];
        for mutate in invalid {
            let mut case = check_in.clone();
            mutate(&mut case);
            assert!(case.validate().is_err(), "{case:?}");
        }
    }

    #[test]
    fn test_reward_points() {
        assert!(validate_reward_points(10).is_ok());
        assert!(validate_reward_points(0).is_err());
    }
}
