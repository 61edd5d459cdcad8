use serde::{Deserialize, Serialize};

/// Cell gradient reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientScheme {
    #[default]
    GreenGauss,
    LeastSquares,
}

impl GradientScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            GradientScheme::GreenGauss => "green_gauss",
            GradientScheme::LeastSquares => "least_squares",
        }
    }
}

impl std::str::FromStr for GradientScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "green_gauss" | "green-gauss" | "gg" => Ok(GradientScheme::GreenGauss),
            "least_squares" | "least-squares" | "lsq" => Ok(GradientScheme::LeastSquares),
            _ => Err(format!("unknown gradient scheme: {}", value)),
        }
    }
}

/// Face value used by the convective flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvectionScheme {
    Upwind,
    Downwind,
    CentralDifference,
    Fromm,
    #[default]
    SecondOrderUpwind,
    Quick,
}

impl ConvectionScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvectionScheme::Upwind => "upwind",
            ConvectionScheme::Downwind => "downwind",
            ConvectionScheme::CentralDifference => "central",
            ConvectionScheme::Fromm => "fromm",
            ConvectionScheme::SecondOrderUpwind => "sou",
            ConvectionScheme::Quick => "quick",
        }
    }

    /// Schemes that read the upstream cell gradient and so widen the stencil.
    pub fn is_higher_order(self) -> bool {
        matches!(
            self,
            ConvectionScheme::Fromm | ConvectionScheme::SecondOrderUpwind | ConvectionScheme::Quick
        )
    }
}

impl std::str::FromStr for ConvectionScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "upwind" => Ok(ConvectionScheme::Upwind),
            "downwind" => Ok(ConvectionScheme::Downwind),
            "central" | "central_difference" | "central-difference" => {
                Ok(ConvectionScheme::CentralDifference)
            }
            "fromm" => Ok(ConvectionScheme::Fromm),
            "sou" | "second_order_upwind" | "second-order-upwind" => {
                Ok(ConvectionScheme::SecondOrderUpwind)
            }
            "quick" => Ok(ConvectionScheme::Quick),
            _ => Err(format!("unknown convection scheme: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_as_str_round_trips_through_from_str() {
        for scheme in [
            ConvectionScheme::Upwind,
            ConvectionScheme::Downwind,
            ConvectionScheme::CentralDifference,
            ConvectionScheme::Fromm,
            ConvectionScheme::SecondOrderUpwind,
            ConvectionScheme::Quick,
        ] {
            assert_eq!(scheme.as_str().parse::<ConvectionScheme>().unwrap(), scheme);
        }
        for scheme in [GradientScheme::GreenGauss, GradientScheme::LeastSquares] {
            assert_eq!(scheme.as_str().parse::<GradientScheme>().unwrap(), scheme);
        }
    }

    #[test]
    fn scheme_from_str_parses_aliases() {
        assert_eq!(
            "second-order-upwind".parse::<ConvectionScheme>().unwrap(),
            ConvectionScheme::SecondOrderUpwind
        );
        assert_eq!(
            "central_difference".parse::<ConvectionScheme>().unwrap(),
            ConvectionScheme::CentralDifference
        );
        assert_eq!("lsq".parse::<GradientScheme>().unwrap(), GradientScheme::LeastSquares);
    }

    #[test]
    fn scheme_from_str_errors_on_unknown() {
        let err = "nope".parse::<ConvectionScheme>().unwrap_err();
        assert!(err.contains("unknown convection scheme"));
        let err = "nope".parse::<GradientScheme>().unwrap_err();
        assert!(err.contains("unknown gradient scheme"));
    }

    #[test]
    fn defaults_are_green_gauss_and_sou() {
        assert_eq!(GradientScheme::default(), GradientScheme::GreenGauss);
        assert_eq!(ConvectionScheme::default(), ConvectionScheme::SecondOrderUpwind);
    }
}
